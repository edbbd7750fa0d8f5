pub mod dto;
pub mod ports;
pub mod use_cases;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
