pub mod smtp_check;
