pub mod payhero;
pub mod umspay;

pub use payhero::PayHeroProvider;
pub use umspay::UmsPayProvider;
