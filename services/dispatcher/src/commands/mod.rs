//! Built-in commands registered at startup and on every reload.

pub mod feedback;
pub mod ping;
pub mod roll;
pub mod settings;
pub mod user_info;

use interaction_hub_registry::{RegistryError, RoutingTable};

use crate::router::{DispatchRegistryBuilder, SharedHandler};

pub fn register_all(builder: &mut DispatchRegistryBuilder) -> Result<(), RegistryError> {
    builder.register(ping::descriptor())?;
    builder.register(roll::descriptor())?;
    settings::register(builder)?;
    builder.register(user_info::descriptor())?;
    feedback::register(builder)?;
    Ok(())
}

pub fn build_routing_table() -> Result<RoutingTable<SharedHandler>, RegistryError> {
    let mut builder = DispatchRegistryBuilder::new();
    register_all(&mut builder)?;
    Ok(builder.build())
}
