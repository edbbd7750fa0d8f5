use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;

use tabhost::bootstrap::config::{Config, EmailSettings};
use tabhost::bootstrap::telemetry;
use tabhost::infrastructure::mail::smtp_check;

#[derive(Parser)]
#[command(
    name = "check-email",
    about = "Print the resolved email settings",
    long_about = "Print the resolved email settings with the password masked. With --probe, open an \
SMTP session using the configured TLS and credentials; with --send, also mail DEFAULT_FROM_EMAIL to itself"
)]
struct Args {
    /// Connect, upgrade with STARTTLS if configured and authenticate
    #[arg(long)]
    probe: bool,

    /// Send a test message from DEFAULT_FROM_EMAIL to itself (implies --probe)
    #[arg(long)]
    send: bool,

    /// Seconds to wait on the SMTP server
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(not set)" } else { value }
}

fn print_settings(email: &EmailSettings) {
    let port_note = if email.port_explicit { "" } else { " (default)" };
    println!("Email configuration");
    println!("  EMAIL_BACKEND:       {}", email.backend);
    println!("  EMAIL_HOST:          {}", email.host);
    println!("  EMAIL_PORT:          {}{port_note}", email.port);
    println!("  EMAIL_USE_TLS:       {}", email.use_tls);
    println!("  EMAIL_HOST_USER:     {}", or_unset(&email.host_user));
    println!(
        "  EMAIL_HOST_PASSWORD: {}",
        if email.host_password.is_empty() { "(not set)" } else { "********" }
    );
    println!("  DEFAULT_FROM_EMAIL:  {}", or_unset(&email.default_from));
    println!("  SERVER_EMAIL:        {}", or_unset(&email.server_email));
    println!(
        "  TAB_DIRECTOR_EMAIL:  {}",
        email.tab_director.as_deref().unwrap_or("(not set)")
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let cfg = Config::from_env()?;
    telemetry::init("tabhost=info", &cfg.error_reporting);
    print_settings(&cfg.email);

    if !args.probe && !args.send {
        return Ok(());
    }
    let email = &cfg.email;
    let mailer = smtp_check::mailer(email, Duration::from_secs(args.timeout_secs))?;
    println!();
    println!("Connecting to {}:{} ...", email.host, email.port);
    smtp_check::verify(&mailer).await?;
    if email.host_user.is_empty() {
        println!("SMTP session opened (no credentials configured).");
    } else {
        println!("SMTP session opened and authenticated as {}.", email.host_user);
    }

    if args.send {
        let code = smtp_check::send_test(&mailer, email).await?;
        println!("Test message sent to {} (server replied {code}).", email.default_from);
    }
    Ok(())
}
