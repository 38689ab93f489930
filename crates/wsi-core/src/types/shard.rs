//! Shard value types.
//!
//! A shard identifies one backend node by URL. Shards are built once from
//! configuration and never mutated; session records hold a copy of the
//! tile-server shard by value as a lookup reference, not as an owned
//! resource.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A node that can be selected by a sharding algorithm.
pub trait Shard: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// URL identifying the node. Also the shard's identity on the hash ring.
    fn url(&self) -> &str;
}

/// Macro to define an immutable URL-identified shard record.
macro_rules! define_shard {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            url: String,
        }

        impl $name {
            /// Create a shard record for the given endpoint.
            pub fn new(url: impl Into<String>) -> Self {
                Self { url: url.into() }
            }

            /// Build a shard pool from configured endpoint URLs.
            pub fn pool<I, U>(urls: I) -> Vec<Self>
            where
                I: IntoIterator<Item = U>,
                U: Into<String>,
            {
                urls.into_iter().map(Self::new).collect()
            }
        }

        impl Shard for $name {
            fn url(&self) -> &str {
                &self.url
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.url)
            }
        }
    };
}

define_shard!(
    /// One Redis node of the key-value tier.
    RedisShard
);

define_shard!(
    /// One tile-server node serving image tiles for its sessions.
    TileServerShard
);
