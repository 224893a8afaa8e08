mod period_reset;

pub use period_reset::PeriodReset;
