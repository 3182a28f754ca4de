//! cosmoscale-azure: Azure-backed collaborators for the capacity pass.
//!
//! Implements the sampler, partition counter and capacity applier seams
//! from `cosmoscale-autoscale` against two REST surfaces:
//!
//! ```text
//! ManagementClient  (AAD bearer token)
//!   └── GET .../collections/{key}/metrics      → per-minute RU samples
//!
//! DocumentClient    (master-key signature, one per database account)
//!   ├── GET dbs/{db}/colls/{coll}/pkranges     → partition count
//!   ├── GET dbs/{db}/colls/{coll}              → collection _self link
//!   ├── GET offers                             → offer for that link
//!   └── PUT offers/{rid}                       → replace throughput
//! ```

pub mod auth;
pub mod backend;
pub mod documents;
pub mod endpoints;
pub mod error;
pub mod management;
pub mod signature;

mod http;

pub use auth::TokenProvider;
pub use backend::AzureBackend;
pub use documents::{CollectionResource, DocumentClient, Offer, OfferContent};
pub use endpoints::CloudEndpoints;
pub use error::{AzureError, AzureResult};
pub use management::ManagementClient;
pub use signature::MasterKey;
