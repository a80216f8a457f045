mod helpers;
mod money;

pub mod op;
mod secret;

pub use helpers::parse_boolean_flag;
pub use money::{Money, MoneyConversionError, WALLET_CURRENCY_CODE, WALLET_CURRENCY_CODE_LOWER};
pub use secret::Secret;
