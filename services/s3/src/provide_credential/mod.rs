mod chain;
pub use chain::ProvideCredentialChain;

mod env;
pub use env::EnvCredentialProvider;

mod rotating;
pub use rotating::RotatingCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;
