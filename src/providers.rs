//! Host and product identity providers.
//!
//! The encoder consults every provider once, at construction. Each provider
//! may come up empty; the encoder substitutes [`NIL_VALUE`] rather than
//! failing.

use std::{io, net::ToSocketAddrs, sync::Arc};

/// Fallback rendered when an identity value is unavailable.
pub const NIL_VALUE: &str = "-";

/// Supplies the name of the server the audit service runs on.
pub trait LocalHostNameProvider: Send + Sync {
    fn local_host_name(&self) -> Option<String>;
}

/// Supplies the name of the product emitting audit events.
pub trait ProductInfoProvider: Send + Sync {
    fn product_name(&self) -> Option<String>;
}

/// Address and name the local host resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalAddress {
    pub host_address: String,
    pub host_name: String,
}

/// Resolves the local host's network identity.
pub trait LocalAddressResolver: Send + Sync {
    fn resolve(&self) -> io::Result<LocalAddress>;
}

/// Reads the host name from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHostName;

impl LocalHostNameProvider for SystemHostName {
    fn local_host_name(&self) -> Option<String> {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
    }
}

/// Resolves the OS host name through the system resolver.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAddressResolver;

impl LocalAddressResolver for SystemAddressResolver {
    fn resolve(&self) -> io::Result<LocalAddress> {
        let host_name = hostname::get()?
            .into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "host name is not UTF-8"))?;
        let addr = (host_name.as_str(), 0)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no address found for host '{host_name}'"),
                )
            })?;
        Ok(LocalAddress {
            host_address: addr.ip().to_string(),
            host_name,
        })
    }
}

/// The set of providers an encoder is built from.
#[derive(Clone)]
pub struct Providers {
    pub host_name: Arc<dyn LocalHostNameProvider>,
    pub product_info: Arc<dyn ProductInfoProvider>,
    pub address: Arc<dyn LocalAddressResolver>,
}

/// Operating-system lookups with no product name.
impl Default for Providers {
    fn default() -> Self {
        Self {
            host_name: Arc::new(SystemHostName),
            product_info: Arc::new(StaticProductInfo::default()),
            address: Arc::new(SystemAddressResolver),
        }
    }
}

impl Providers {
    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_info = Arc::new(StaticProductInfo(Some(name.into())));
        self
    }

    pub fn with_host_name(mut self, provider: Arc<dyn LocalHostNameProvider>) -> Self {
        self.host_name = provider;
        self
    }

    pub fn with_product_info(mut self, provider: Arc<dyn ProductInfoProvider>) -> Self {
        self.product_info = provider;
        self
    }

    pub fn with_address_resolver(mut self, resolver: Arc<dyn LocalAddressResolver>) -> Self {
        self.address = resolver;
        self
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Providers(<dyn providers>)")
    }
}

/// Host name fixed at configuration time.
#[derive(Clone, Debug, Default)]
pub struct StaticHostName(pub Option<String>);

impl LocalHostNameProvider for StaticHostName {
    fn local_host_name(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Product name fixed at configuration time.
#[derive(Clone, Debug, Default)]
pub struct StaticProductInfo(pub Option<String>);

impl ProductInfoProvider for StaticProductInfo {
    fn product_name(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Resolver returning a fixed address, or failing when none is set.
#[derive(Clone, Debug, Default)]
pub struct StaticAddressResolver(pub Option<LocalAddress>);

impl StaticAddressResolver {
    pub fn new(host_address: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self(Some(LocalAddress {
            host_address: host_address.into(),
            host_name: host_name.into(),
        }))
    }

    /// A resolver that always fails.
    pub fn unresolvable() -> Self {
        Self(None)
    }
}

impl LocalAddressResolver for StaticAddressResolver {
    fn resolve(&self) -> io::Result<LocalAddress> {
        self.0
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "local address unavailable"))
    }
}
