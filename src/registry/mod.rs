//! Static method and endpoint tables.
//!
//! The registry is built once at startup (defaults plus any configured
//! extras) and injected into the client. Lookups return `Option` — a
//! missing entry is the caller's problem to classify, the registry never
//! fails.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Devnet,
    Testnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Devnet => write!(f, "devnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "devnet" => Ok(Network::Devnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{other}' (expected mainnet, devnet or testnet)")),
        }
    }
}

/// A reachable gateway base URL.
///
/// Base URLs are treated as directories: a URL with a path prefix must end
/// with a trailing slash for method paths to append correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub url: Url,
    pub network: Network,
    /// At most one endpoint per network is kept as the default; later
    /// duplicates are demoted.
    #[serde(default)]
    pub default: bool,
}

/// Human metadata for a remote operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub id: String,
    pub requires_auth: bool,
    /// Allowed calls per rolling 60-second window.
    pub rate_limit: u32,
}

pub struct Registry {
    methods: HashMap<String, MethodDescriptor>,
    endpoints: HashMap<String, Endpoint>,
    defaults: HashMap<Network, String>,
}

impl Registry {
    /// Builds a registry from explicit tables. The first endpoint flagged
    /// default for a network wins; later flags for the same network are
    /// ignored.
    pub fn new(methods: Vec<MethodDescriptor>, endpoints: Vec<Endpoint>) -> Self {
        let methods = methods.into_iter().map(|m| (m.id.clone(), m)).collect();

        let mut defaults: HashMap<Network, String> = HashMap::new();
        let mut table: HashMap<String, Endpoint> = HashMap::new();
        for endpoint in endpoints {
            if endpoint.default {
                defaults.entry(endpoint.network).or_insert_with(|| endpoint.id.clone());
            }
            table.insert(endpoint.id.clone(), endpoint);
        }

        Self {
            methods,
            endpoints: table,
            defaults,
        }
    }

    /// The built-in tables: the gateway's read-only query methods and one
    /// default endpoint per network.
    pub fn with_defaults() -> Self {
        Self::new(default_methods(), default_endpoints())
    }

    /// Adds configured endpoints on top of the built-ins. A configured
    /// endpoint with a known id replaces the built-in one; a configured
    /// default takes over as its network's default.
    pub fn with_endpoints(mut self, extra: Vec<Endpoint>) -> Self {
        for endpoint in extra {
            if endpoint.default {
                self.defaults.insert(endpoint.network, endpoint.id.clone());
            }
            self.endpoints.insert(endpoint.id.clone(), endpoint);
        }
        self
    }

    pub fn method(&self, method_id: &str) -> Option<&MethodDescriptor> {
        self.methods.get(method_id)
    }

    pub fn endpoint(&self, endpoint_id: &str) -> Option<&Endpoint> {
        self.endpoints.get(endpoint_id)
    }

    pub fn default_endpoint(&self, network: Network) -> Option<&Endpoint> {
        self.defaults.get(&network).and_then(|id| self.endpoints.get(id))
    }

    pub fn method_ids(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

fn descriptor(id: &str, requires_auth: bool, rate_limit: u32) -> MethodDescriptor {
    MethodDescriptor {
        id: id.to_string(),
        requires_auth,
        rate_limit,
    }
}

fn default_methods() -> Vec<MethodDescriptor> {
    vec![
        descriptor("getAccountInfo", true, 60),
        descriptor("getBalance", true, 120),
        descriptor("getTransaction", true, 60),
        descriptor("getTokenAccounts", true, 60),
        descriptor("getSignaturesForAddress", true, 30),
        descriptor("getProgramData", true, 30),
        descriptor("getVersion", false, 10),
        descriptor("getNetworkStatus", false, 30),
        descriptor("getClusterStatus", false, 30),
    ]
}

fn default_endpoints() -> Vec<Endpoint> {
    fn endpoint(id: &str, name: &str, url: &str, network: Network) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            name: name.to_string(),
            // Built-in URLs are known-good literals.
            url: Url::parse(url).expect("built-in endpoint URL is valid"),
            network,
            default: true,
        }
    }

    vec![
        endpoint("mainnet-primary", "Mainnet gateway", "https://gateway.chaingate.io", Network::Mainnet),
        endpoint("devnet-primary", "Devnet gateway", "https://devnet.gateway.chaingate.io", Network::Devnet),
        endpoint(
            "testnet-primary",
            "Testnet gateway",
            "https://testnet.gateway.chaingate.io",
            Network::Testnet,
        ),
    ]
}
