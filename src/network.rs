//! Wireless association

use log::info;

use crate::retry::{Attempt, RetryError, RetryPolicy, retry};

/// Trait for network backends the broker connection runs over.
pub trait Network {
    type Error: std::fmt::Debug;

    /// Start one association attempt and wait for it to finish
    fn associate(&mut self) -> Result<(), Self::Error>;

    fn is_associated(&self) -> bool;

    /// Errors that will never clear by retrying (e.g. malformed credentials)
    fn is_fatal(_error: &Self::Error) -> bool {
        false
    }
}

/// Associate with the network, retrying per `policy`.
pub fn connect_network<N: Network>(
    network: &mut N,
    policy: &RetryPolicy,
) -> Result<(), RetryError<N::Error>> {
    if network.is_associated() {
        return Ok(());
    }

    retry(policy, "Network association", |attempt| {
        info!("Associating with network (attempt {})", attempt);
        network.associate().map_err(|e| {
            if N::is_fatal(&e) {
                Attempt::Abort(e)
            } else {
                Attempt::Retry(e)
            }
        })
    })?;

    info!("Network associated");
    Ok(())
}

/// Host networking managed by the operating system; always associated.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostNetwork;

impl Network for HostNetwork {
    type Error = std::convert::Infallible;

    fn associate(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_associated(&self) -> bool {
        true
    }
}
