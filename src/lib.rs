// Module layout (Clean Architecture style)
// - bootstrap: settings, telemetry and startup wiring
// - infrastructure: Postgres/Redis/network adapters
// - presentation: HTTP handlers and routing
// - application: ports and use cases (tenancy, auth, worker)
// - domain: tenant model and naming rules

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
