use crate::{
    dns::Connector,
    secrets::SecretStore,
};

/// Holds the clients shared by all challenge invocations. Nothing in here is mutated after initialization.
pub struct Context {
    pub secrets: Box<dyn SecretStore>,
    pub connector: Box<dyn Connector>,
}
