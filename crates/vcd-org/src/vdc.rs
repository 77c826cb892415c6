//! Virtual datacenter client.

use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::form_urlencoded;
use vcd_core::endpoints::{expand_endpoint, ENDPOINT_VDC_CAPABILITIES};
use vcd_core::ids::equal_ids;
use vcd_core::retry::EDGE_GATEWAY_READ;
use vcd_core::{Error, Session};
use vcd_resolve::{unique_match, Resolver};
use vcd_task::{CancellationToken, Task, TaskClient, TaskStatus};

use crate::models::{
    capability_value, CreateVmParams, EdgeGateway, EdgeGatewayRecords, OrgVdcNetwork, VApp, Vdc,
    VdcCapability, Vm, MIME_CREATE_VM_PARAMS, MIME_QUERY_RECORDS, NETWORK_PROVIDER_NSXT, NETWORK_PROVIDER_NSXV,
};
use crate::openapi::{get_all_items, with_query};
use crate::Result;

/// Capability naming the VDC's network backing.
pub const NETWORK_PROVIDER_CAPABILITY: &str = "networkProvider";

/// Client for one VDC.
#[derive(Debug)]
pub struct VdcClient {
    session: Session,
    vdc: RwLock<Vdc>,
}

impl VdcClient {
    /// Wrap an already fetched VDC document.
    #[must_use]
    pub fn new(session: Session, vdc: Vdc) -> Self {
        Self {
            session,
            vdc: RwLock::new(vdc),
        }
    }

    /// Fetch the VDC at `href`.
    pub async fn get(session: Session, href: &str) -> Result<Self> {
        let vdc: Vdc = session.fetch_as(href, None).await?;
        Ok(Self::new(session, vdc))
    }

    /// Snapshot of the current VDC document.
    pub async fn vdc(&self) -> Vdc {
        self.vdc.read().await.clone()
    }

    /// Re-fetch the VDC document.
    pub async fn refresh(&self) -> Result<()> {
        let href = self.href().await?;
        let fresh: Vdc = self.session.fetch_as(&href, None).await?;
        *self.vdc.write().await = fresh;
        Ok(())
    }

    async fn href(&self) -> Result<String> {
        let href = self.vdc.read().await.href.clone();
        if href.is_empty() {
            return Err(Error::InvalidRequest("VDC has no HREF".to_string()));
        }
        Ok(href)
    }

    async fn snapshot(&self, refresh: bool) -> Result<Vdc> {
        if refresh {
            self.refresh().await?;
        }
        Ok(self.vdc().await)
    }

    fn resolver(&self) -> Resolver {
        Resolver::with_predicate(self.session.id_predicate())
    }

    /// Query the edge gateways of this VDC.
    pub async fn get_edge_gateway_records(&self, refresh: bool) -> Result<EdgeGatewayRecords> {
        let vdc = self.snapshot(refresh).await?;
        let href = vdc
            .link_href("edgeGateways", MIME_QUERY_RECORDS)
            .ok_or_else(|| Error::NotFound(format!("edge gateway query link in VDC {}", vdc.name)))?;
        self.session.fetch_as(href, None).await
    }

    /// Fetch an edge gateway by HREF.
    ///
    /// Runs under the session's [`EDGE_GATEWAY_READ`] retry policy: some
    /// server versions answer this read with a spurious server error.
    pub async fn get_edge_gateway_by_href(&self, href: &str) -> Result<EdgeGateway> {
        if href.is_empty() {
            return Err(Error::InvalidRequest("empty edge gateway HREF".to_string()));
        }
        let session = &self.session;
        session
            .retry(EDGE_GATEWAY_READ, move || session.fetch_as(href, None))
            .await
    }

    /// Find the edge gateway with this name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if none matches, [`Error::Ambiguous`] if several do.
    pub async fn get_edge_gateway_by_name(&self, name: &str, refresh: bool) -> Result<EdgeGateway> {
        let records = self.get_edge_gateway_records(refresh).await?;
        let matches = records
            .record
            .iter()
            .filter(|record| record.name == name)
            .collect();
        let record = unique_match("edge gateway", name, matches)?;
        self.get_edge_gateway_by_href(&record.href).await
    }

    /// Find the edge gateway with this URN, UUID or HREF.
    pub async fn get_edge_gateway_by_id(&self, id: &str, refresh: bool) -> Result<EdgeGateway> {
        let records = self.get_edge_gateway_records(refresh).await?;
        let record = records
            .record
            .iter()
            .find(|record| equal_ids(id, "", &record.href))
            .ok_or_else(|| Error::NotFound(format!("edge gateway '{id}'")))?;
        self.get_edge_gateway_by_href(&record.href).await
    }

    /// Find an edge gateway by name or identifier.
    pub async fn get_edge_gateway_by_name_or_id(
        &self,
        identifier: &str,
        refresh: bool,
    ) -> Result<EdgeGateway> {
        self.resolver()
            .resolve(
                identifier,
                refresh,
                |name, refresh| async move { self.get_edge_gateway_by_name(&name, refresh).await },
                |id, refresh| async move { self.get_edge_gateway_by_id(&id, refresh).await },
            )
            .await
    }

    /// Fetch a vApp by HREF.
    pub async fn get_vapp_by_href(&self, href: &str) -> Result<VApp> {
        self.session.fetch_as(href, None).await
    }

    /// Find the vApp with this name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if none matches, [`Error::Ambiguous`] if several do.
    pub async fn get_vapp_by_name(&self, name: &str, refresh: bool) -> Result<VApp> {
        let vdc = self.snapshot(refresh).await?;
        let matches = vdc
            .vapp_references()
            .filter(|reference| reference.name.as_deref() == Some(name))
            .collect();
        let reference = unique_match("vApp", name, matches)?;
        self.get_vapp_by_href(&reference.href).await
    }

    /// Find the vApp with this URN, UUID or HREF.
    pub async fn get_vapp_by_id(&self, id: &str, refresh: bool) -> Result<VApp> {
        let vdc = self.snapshot(refresh).await?;
        let reference = vdc
            .vapp_references()
            .find(|reference| {
                equal_ids(id, reference.id.as_deref().unwrap_or_default(), &reference.href)
            })
            .ok_or_else(|| Error::NotFound(format!("vApp '{id}'")))?;
        self.get_vapp_by_href(&reference.href).await
    }

    /// Find a vApp by name or identifier.
    pub async fn get_vapp_by_name_or_id(&self, identifier: &str, refresh: bool) -> Result<VApp> {
        self.resolver()
            .resolve(
                identifier,
                refresh,
                |name, refresh| async move { self.get_vapp_by_name(&name, refresh).await },
                |id, refresh| async move { self.get_vapp_by_id(&id, refresh).await },
            )
            .await
    }

    /// Fetch an org VDC network by HREF.
    pub async fn get_org_vdc_network_by_href(&self, href: &str) -> Result<OrgVdcNetwork> {
        self.session.fetch_as(href, None).await
    }

    /// Find the org VDC network with this name among the VDC's available networks.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if none matches, [`Error::Ambiguous`] if several do.
    pub async fn get_org_vdc_network_by_name(
        &self,
        name: &str,
        refresh: bool,
    ) -> Result<OrgVdcNetwork> {
        let vdc = self.snapshot(refresh).await?;
        let matches = vdc
            .network_references()
            .filter(|reference| reference.name.as_deref() == Some(name))
            .collect();
        let reference = unique_match("network", name, matches)?;
        self.get_org_vdc_network_by_href(&reference.href).await
    }

    /// Find the org VDC network with this URN, UUID or HREF.
    ///
    /// Network references do not always carry an ID, so the HREF is compared too.
    pub async fn get_org_vdc_network_by_id(&self, id: &str, refresh: bool) -> Result<OrgVdcNetwork> {
        let vdc = self.snapshot(refresh).await?;
        let reference = vdc
            .network_references()
            .find(|reference| {
                equal_ids(id, reference.id.as_deref().unwrap_or_default(), &reference.href)
            })
            .ok_or_else(|| Error::NotFound(format!("network '{id}'")))?;
        self.get_org_vdc_network_by_href(&reference.href).await
    }

    /// Find an org VDC network by name or identifier.
    pub async fn get_org_vdc_network_by_name_or_id(
        &self,
        identifier: &str,
        refresh: bool,
    ) -> Result<OrgVdcNetwork> {
        self.resolver()
            .resolve(
                identifier,
                refresh,
                |name, refresh| async move { self.get_org_vdc_network_by_name(&name, refresh).await },
                |id, refresh| async move { self.get_org_vdc_network_by_id(&id, refresh).await },
            )
            .await
    }

    /// List the VDC's capabilities.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedEndpoint`] if the server predates the capabilities
    /// endpoint, [`Error::InvalidRequest`] if the VDC document has no URN.
    pub async fn get_capabilities(&self) -> Result<Vec<VdcCapability>> {
        let id = self
            .vdc
            .read()
            .await
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::InvalidRequest("VDC ID must be set to get capabilities".to_string()))?;

        let version = self
            .session
            .check_endpoint_compatibility(ENDPOINT_VDC_CAPABILITIES)
            .await?;
        let id: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
        let href = self
            .session
            .openapi_href(&expand_endpoint(ENDPOINT_VDC_CAPABILITIES, &[id.as_str()]));
        get_all_items(&self.session, &href, version, &[]).await
    }

    async fn network_provider_is(&self, provider: &str) -> bool {
        match self.get_capabilities().await {
            Ok(capabilities) => {
                capability_value(&capabilities, NETWORK_PROVIDER_CAPABILITY) == Some(provider)
            }
            Err(err) => {
                debug!(error = %err, "VDC capabilities unavailable");
                false
            }
        }
    }

    /// Returns true if the VDC is backed by NSX-T. Errors read as false.
    pub async fn is_nsxt(&self) -> bool {
        self.network_provider_is(NETWORK_PROVIDER_NSXT).await
    }

    /// Returns true if the VDC is backed by NSX-V. Errors read as false.
    pub async fn is_nsxv(&self) -> bool {
        self.network_provider_is(NETWORK_PROVIDER_NSXV).await
    }

    /// Start deleting the VDC.
    ///
    /// # Errors
    ///
    /// [`Error::TaskFailed`] if the server reports the task as already failed.
    pub async fn delete(&self, force: bool, recursive: bool) -> Result<Task> {
        let href = self.href().await?;
        let href = with_query(
            &href,
            &[
                ("force", if force { "true" } else { "false" }),
                ("recursive", if recursive { "true" } else { "false" }),
            ],
        );
        debug!(%href, force, recursive, "deleting VDC");

        let task: Task = self
            .session
            .send_as::<Value, _>(Method::DELETE, &href, None, None)
            .await?;
        if task.status == TaskStatus::Error {
            return Err(Error::TaskFailed {
                message: task.failure_message(),
            });
        }
        Ok(task)
    }

    /// Delete the VDC and wait for the task to finish.
    pub async fn delete_wait(
        &self,
        force: bool,
        recursive: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let task = self.delete(force, recursive).await?;
        TaskClient::new(self.session.clone())
            .wait_until_complete(&task, cancel)
            .await?;
        Ok(())
    }

    /// Start creating a VM that belongs to no user-visible vApp.
    pub async fn create_standalone_vm_async(&self, params: &CreateVmParams) -> Result<Task> {
        let vdc = self.vdc().await;
        if vdc.href.is_empty() {
            return Err(Error::InvalidRequest("VDC has no HREF".to_string()));
        }
        let href = vdc
            .link_href("add", MIME_CREATE_VM_PARAMS)
            .ok_or_else(|| Error::NotFound(format!("VM creation link in VDC {}", vdc.name)))?;
        debug!(vm = %params.name, vdc = %vdc.name, "creating standalone VM");
        self.session
            .send_as(Method::POST, href, None, Some(params))
            .await
    }

    /// Locate the VM created by a finished standalone-VM task.
    ///
    /// The task owner is the hidden vApp wrapping the new VM.
    pub async fn get_vm_from_task(&self, task: &Task, name: &str) -> Result<Vm> {
        let owner = task
            .owner_href()
            .ok_or_else(|| Error::NotFound(format!("owner of the task creating VM {name}")))?;
        let vapp = self.get_vapp_by_href(owner).await?;
        let vms = vapp.children.map(|children| children.vm).unwrap_or_default();
        match vms.as_slice() {
            [] => Err(Error::NotFound(format!("VM in vApp {}", vapp.name))),
            [vm] => self.session.fetch_as(&vm.href, None).await,
            many => {
                warn!(vapp = %vapp.name, count = many.len(), "standalone vApp holds several VMs");
                Err(Error::Ambiguous {
                    kind: "vm".to_string(),
                    identifier: vapp.name,
                    matches: many.len(),
                })
            }
        }
    }

    /// Create a standalone VM and wait for it.
    pub async fn create_standalone_vm(
        &self,
        params: &CreateVmParams,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vm> {
        let task = self.create_standalone_vm_async(params).await?;
        let task = TaskClient::new(self.session.clone())
            .wait_until_complete(&task, cancel)
            .await?;
        self.get_vm_from_task(&task, &params.name).await
    }
}
