//! Organization and VDC clients for VMware Cloud Director.
//!
//! These clients tie the core pieces together: lookups go through the
//! name-or-ID resolver, versioned OpenAPI reads are gated by the session's
//! capability negotiator, the edge gateway read runs under the transient
//! retry policy, and asynchronous mutations hand back tasks for
//! [`vcd_task::TaskClient`].

#![deny(missing_docs)]

pub mod models;
mod openapi;
pub mod org;
pub mod vdc;

pub use models::{
    AvailableNetworks, Catalog, CatalogRecord, CreateVmParams, EdgeGateway, EdgeGatewayRecord,
    EdgeGatewayRecords, Link, Org, OrgVdcNetwork, QueryResultRecords, VApp, Vdc, VdcCapability,
    VdcComputePolicy, Vm,
};
pub use openapi::DEFAULT_PAGE_SIZE;
pub use org::{org_href, OrgClient, QUERY_PATH};
pub use vdc::VdcClient;

/// Convenient result alias that reuses the shared vCD error type.
pub type Result<T> = vcd_core::Result<T>;
