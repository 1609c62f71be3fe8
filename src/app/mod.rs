pub mod checkout;
pub mod receipt;
