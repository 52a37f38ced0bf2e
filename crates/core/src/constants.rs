use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Currency used for wallets unless a user is configured otherwise.
pub const DEFAULT_CURRENCY: &str = "ZAR";

/// Decimal places kept for money amounts (cents).
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Decimal places kept for investor share percentages.
pub const SHARE_DECIMAL_PLACES: u32 = 6;

/// Newly deposited funds stay in `locked_balance` for this many days.
pub const WALLET_LOCK_PERIOD_DAYS: i64 = 7;

/// A completed payment for the same invoice inside this window blocks a new checkout.
pub const DUPLICATE_PAYMENT_WINDOW_MINUTES: i64 = 5;

/// South African standard VAT rate, in percent.
pub const DEFAULT_VAT_RATE: Decimal = dec!(15);

/// Platform commission on a successfully funded deal, in percent.
pub const PLATFORM_FEE_PERCENT: Decimal = dec!(5);

/// Flat fee charged on every wallet withdrawal.
pub const WITHDRAWAL_FEE: Decimal = dec!(5.00);

/// Allowed deviation between reported and verified revenue, in percent.
pub const REVENUE_TOLERANCE_PERCENT: Decimal = dec!(5);

/// Minimum days between two overdue reminders for the same invoice.
pub const REMINDER_INTERVAL_DAYS: i64 = 3;

/// Reminders stop after this many have been sent.
pub const MAX_REMINDERS: i32 = 3;

pub const INVOICE_NUMBER_PREFIX: &str = "INV-";
