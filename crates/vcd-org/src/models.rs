//! Organization, VDC and related documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Catalog media type.
pub const MIME_CATALOG: &str = "application/vnd.vmware.vcloud.catalog+xml";
/// Catalog media type as seen by a system administrator.
pub const MIME_ADMIN_CATALOG: &str = "application/vnd.vmware.admin.catalog+xml";
/// VDC media type.
pub const MIME_VDC: &str = "application/vnd.vmware.vcloud.vdc+xml";
/// VDC media type as seen by a system administrator.
pub const MIME_ADMIN_VDC: &str = "application/vnd.vmware.admin.vdc+xml";
/// vApp media type.
pub const MIME_VAPP: &str = "application/vnd.vmware.vcloud.vApp+xml";
/// Query result media type.
pub const MIME_QUERY_RECORDS: &str = "application/vnd.vmware.vcloud.query.records+xml";
/// Task list media type.
pub const MIME_TASKS_LIST: &str = "application/vnd.vmware.vcloud.tasksList+xml";
/// Standalone VM creation parameters media type.
pub const MIME_CREATE_VM_PARAMS: &str = "application/vnd.vmware.vcloud.CreateVmParams+xml";

/// Query type for catalogs as seen by a tenant.
pub const QUERY_TYPE_CATALOG: &str = "catalog";
/// Query type for catalogs as seen by a system administrator.
pub const QUERY_TYPE_ADMIN_CATALOG: &str = "adminCatalog";

/// `networkProvider` capability value for NSX-T backed VDCs.
pub const NETWORK_PROVIDER_NSXT: &str = "NSX_T";
/// `networkProvider` capability value for NSX-V backed VDCs.
pub const NETWORK_PROVIDER_NSXV: &str = "NSX_V";

/// Compare media types ignoring the `+xml` / `+json` suffix.
#[must_use]
pub fn media_type_matches(actual: Option<&str>, expected: &str) -> bool {
    fn base(media_type: &str) -> &str {
        media_type.split('+').next().unwrap_or(media_type)
    }
    actual.is_some_and(|actual| base(actual).eq_ignore_ascii_case(base(expected)))
}

/// Hyperlink to a related entity or action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Relation, e.g. `down`, `add`, `edgeGateways`.
    #[serde(default)]
    pub rel: String,
    /// Target HREF.
    pub href: String,
    /// Target URN, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Target name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Target media type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Link {
    /// Returns true if the link targets the given media type.
    #[must_use]
    pub fn is_type(&self, media_type: &str) -> bool {
        media_type_matches(self.media_type.as_deref(), media_type)
    }

    /// Returns true if the link has this name.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    /// The link's URN, or an empty string.
    #[must_use]
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

/// Organization document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    /// Org HREF.
    pub href: String,
    /// Org URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Org name.
    pub name: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Links to catalogs, VDCs and actions.
    #[serde(default)]
    pub link: Vec<Link>,
}

/// Catalog document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Catalog HREF.
    pub href: String,
    /// Catalog URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Catalog name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the catalog is published to other orgs.
    #[serde(default)]
    pub is_published: bool,
}

/// Reference to an entity inside a VDC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// Entity HREF.
    pub href: String,
    /// Entity URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Entity name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Entity media type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Container of a VDC's resource references.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEntities {
    /// References.
    #[serde(default)]
    pub resource_entity: Vec<ResourceReference>,
}

/// Virtual datacenter document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vdc {
    /// VDC HREF.
    pub href: String,
    /// VDC URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// VDC name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allocation model (e.g. `AllocationVApp`, `Flex`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_model: Option<String>,
    /// Whether the VDC is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    /// Links to queries and actions.
    #[serde(default)]
    pub link: Vec<Link>,
    /// vApps, templates and media contained in the VDC.
    #[serde(default)]
    pub resource_entities: Option<ResourceEntities>,
    /// Org VDC networks available to the VDC.
    #[serde(default)]
    pub available_networks: Option<AvailableNetworks>,
}

impl Vdc {
    /// HREF of the first link matching `rel` and `media_type`.
    #[must_use]
    pub fn link_href(&self, rel: &str, media_type: &str) -> Option<&str> {
        self.link
            .iter()
            .find(|link| link.rel == rel && link.is_type(media_type))
            .map(|link| link.href.as_str())
    }

    /// References to the vApps in this VDC.
    pub fn vapp_references(&self) -> impl Iterator<Item = &ResourceReference> {
        self.resource_entities
            .iter()
            .flat_map(|entities| entities.resource_entity.iter())
            .filter(|reference| media_type_matches(reference.media_type.as_deref(), MIME_VAPP))
    }

    /// References to the org VDC networks available to this VDC.
    pub fn network_references(&self) -> impl Iterator<Item = &ResourceReference> {
        self.available_networks
            .iter()
            .flat_map(|networks| networks.network.iter())
    }
}

/// Container of a VDC's available networks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableNetworks {
    /// Network references.
    #[serde(default)]
    pub network: Vec<ResourceReference>,
}

/// Org VDC network document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrgVdcNetwork {
    /// Network HREF.
    pub href: String,
    /// Network URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Network name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the network is shared with other VDCs of the org.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_shared: Option<bool>,
    /// Network configuration, kept as returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

/// One row of a catalog query.
///
/// Tenants and system administrators receive the same columns under
/// different element names; see [`QueryResultRecords`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Catalog HREF.
    pub href: String,
    /// Catalog name.
    pub name: String,
    /// Owning org name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    /// Owner user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Whether the catalog is shared.
    #[serde(default)]
    pub is_shared: bool,
    /// Whether the catalog is published.
    #[serde(default)]
    pub is_published: bool,
    /// Number of vApp templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_vapp_templates: Option<u32>,
    /// Number of media items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_media: Option<u32>,
}

/// One page of a typed query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultRecords {
    /// Total matching records across all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Page number, starting at 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Catalog rows for tenants.
    #[serde(default)]
    pub catalog_record: Vec<CatalogRecord>,
    /// Catalog rows for system administrators.
    #[serde(default)]
    pub admin_catalog_record: Vec<CatalogRecord>,
}

impl QueryResultRecords {
    /// Take the catalog rows for the caller's privilege level.
    #[must_use]
    pub fn into_catalog_records(self, sys_admin: bool) -> Vec<CatalogRecord> {
        if sys_admin {
            self.admin_catalog_record
        } else {
            self.catalog_record
        }
    }
}

/// One row of the edge gateway query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGatewayRecord {
    /// Gateway HREF.
    pub href: String,
    /// Gateway name.
    pub name: String,
    /// Owning VDC HREF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdc: Option<String>,
    /// Number of configured interfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_ext_networks: Option<u32>,
}

/// Result of the edge gateway query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGatewayRecords {
    /// Total matching records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Records.
    #[serde(default, alias = "edgeGatewayRecord")]
    pub record: Vec<EdgeGatewayRecord>,
}

/// Edge gateway document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGateway {
    /// Gateway HREF.
    pub href: String,
    /// Gateway URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Gateway name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Gateway configuration, kept as returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
}

/// Virtual machine document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    /// VM HREF.
    pub href: String,
    /// VM URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// VM name.
    pub name: String,
    /// Numeric power status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// Whether the VM is deployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed: Option<bool>,
}

/// Children of a vApp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VAppChildren {
    /// Virtual machines.
    #[serde(default)]
    pub vm: Vec<Vm>,
}

/// vApp document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VApp {
    /// vApp HREF.
    pub href: String,
    /// vApp URN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// vApp name.
    pub name: String,
    /// Numeric status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// Contained VMs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<VAppChildren>,
}

/// Parameters for creating a VM without a vApp template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmParams {
    /// Name of the new VM.
    pub name: String,
    /// Power on after creation.
    #[serde(default)]
    pub power_on: bool,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// VM definition section, passed through as given.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub create_vm: Value,
}

impl CreateVmParams {
    /// Parameters for a VM with the given name and no definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            power_on: false,
            description: None,
            create_vm: Value::Null,
        }
    }
}

/// A VDC capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VdcCapability {
    /// Capability name, e.g. `networkProvider`.
    pub name: String,
    /// Capability value.
    #[serde(default)]
    pub value: Value,
    /// Value type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Value of the named capability rendered as a string.
#[must_use]
pub fn capability_value<'a>(capabilities: &'a [VdcCapability], name: &str) -> Option<&'a str> {
    capabilities
        .iter()
        .find(|capability| capability.name == name)
        .and_then(|capability| capability.value.as_str())
}

/// VDC compute policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VdcComputePolicy {
    /// Policy URN.
    pub id: String,
    /// Policy name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of virtual CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    /// CPU speed in MHz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_speed: Option<u32>,
    /// Memory in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Whether this policy only sizes VMs.
    #[serde(default)]
    pub is_sizing_only: bool,
}

/// One page of an OpenAPI collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiPage<T> {
    /// Total matching items.
    #[serde(default)]
    pub result_total: u64,
    /// Number of pages.
    #[serde(default)]
    pub page_count: u32,
    /// This page's number, starting at one.
    #[serde(default)]
    pub page: u32,
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn media_types_match_across_encodings() {
        assert!(media_type_matches(
            Some("application/vnd.vmware.vcloud.catalog+json"),
            MIME_CATALOG
        ));
        assert!(media_type_matches(Some(MIME_VAPP), MIME_VAPP));
        assert!(!media_type_matches(Some(MIME_VDC), MIME_CATALOG));
        assert!(!media_type_matches(None, MIME_CATALOG));
    }

    #[test]
    fn vdc_links_and_vapps() {
        let vdc: Vdc = serde_json::from_value(json!({
            "href": "https://vcd.example.com/api/vdc/1",
            "name": "dev",
            "link": [
                {"rel": "edgeGateways", "href": "https://vcd.example.com/api/admin/vdc/1/edgeGateways",
                 "type": MIME_QUERY_RECORDS},
                {"rel": "add", "href": "https://vcd.example.com/api/vdc/1/action/createVm",
                 "type": MIME_CREATE_VM_PARAMS}
            ],
            "resourceEntities": {"resourceEntity": [
                {"href": "https://vcd.example.com/api/vApp/vapp-1", "name": "web", "type": MIME_VAPP},
                {"href": "https://vcd.example.com/api/media/m-1", "name": "iso",
                 "type": "application/vnd.vmware.vcloud.media+xml"}
            ]}
        }))
        .unwrap();

        assert_eq!(
            vdc.link_href("add", MIME_CREATE_VM_PARAMS),
            Some("https://vcd.example.com/api/vdc/1/action/createVm")
        );
        assert!(vdc.link_href("add", MIME_QUERY_RECORDS).is_none());
        let names: Vec<_> = vdc.vapp_references().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["web"]);
    }

    #[test]
    fn catalog_records_follow_privilege() {
        let page: QueryResultRecords = serde_json::from_value(json!({
            "total": 2,
            "page": 1,
            "pageSize": 128,
            "catalogRecord": [{"href": "https://vcd.example.com/api/catalog/1", "name": "public"}],
            "adminCatalogRecord": [{"href": "https://vcd.example.com/api/admin/catalog/2",
                                    "name": "images", "isShared": true}]
        }))
        .unwrap();

        let admin = page.clone().into_catalog_records(true);
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].name, "images");
        assert!(admin[0].is_shared);

        let tenant = page.into_catalog_records(false);
        assert_eq!(tenant[0].name, "public");
        assert!(!tenant[0].is_shared);
    }

    #[test]
    fn vdc_network_references() {
        let vdc: Vdc = serde_json::from_value(json!({
            "href": "https://vcd.example.com/api/vdc/1",
            "name": "dev",
            "availableNetworks": {"network": [
                {"href": "https://vcd.example.com/api/network/n-1", "name": "routed"}
            ]}
        }))
        .unwrap();
        let names: Vec<_> = vdc.network_references().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec!["routed"]);
    }

    #[test]
    fn capability_lookup() {
        let capabilities: Vec<VdcCapability> = serde_json::from_value(json!([
            {"name": "networkProvider", "value": "NSX_T", "type": "String"},
            {"name": "crossVdc", "value": true, "type": "Boolean"}
        ]))
        .unwrap();
        assert_eq!(
            capability_value(&capabilities, "networkProvider"),
            Some(NETWORK_PROVIDER_NSXT)
        );
        assert_eq!(capability_value(&capabilities, "crossVdc"), None);
        assert_eq!(capability_value(&capabilities, "missing"), None);
    }

    #[test]
    fn create_vm_params_omit_empty_definition() {
        let json = serde_json::to_value(CreateVmParams::new("vm-1")).unwrap();
        assert_eq!(json, json!({"name": "vm-1", "powerOn": false}));
    }
}
