//! Organization client: catalogs, VDCs and compute policies.

use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::form_urlencoded;
use vcd_core::endpoints::ENDPOINT_VDC_COMPUTE_POLICIES;
use vcd_core::ids::{equal_ids, OrgId};
use vcd_core::{Error, Session};
use vcd_resolve::{unique_match, Resolver};
use vcd_task::TasksList;

use crate::models::{
    Catalog, CatalogRecord, Link, Org, QueryResultRecords, VdcComputePolicy, MIME_ADMIN_CATALOG,
    MIME_ADMIN_VDC, MIME_CATALOG, MIME_TASKS_LIST, MIME_VDC, QUERY_TYPE_ADMIN_CATALOG,
    QUERY_TYPE_CATALOG,
};
use crate::openapi::{get_all_items, with_query, DEFAULT_PAGE_SIZE};
use crate::vdc::VdcClient;
use crate::Result;

/// HREF of an organization, using the admin view for system administrators.
#[must_use]
pub fn org_href(session: &Session, id: &OrgId) -> String {
    if session.is_sys_admin() {
        format!("admin/org/{}", id.as_uuid())
    } else {
        format!("org/{}", id.as_uuid())
    }
}

/// HREF of the typed query service, relative to the API root.
pub const QUERY_PATH: &str = "query";

/// Client for one organization.
///
/// Holds the last fetched org document. Lookups with `refresh` re-fetch it
/// before searching its links.
#[derive(Debug)]
pub struct OrgClient {
    session: Session,
    org: RwLock<Org>,
}

impl OrgClient {
    /// Wrap an already fetched org document.
    #[must_use]
    pub fn new(session: Session, org: Org) -> Self {
        Self {
            session,
            org: RwLock::new(org),
        }
    }

    /// Fetch the org at `href`.
    pub async fn get(session: Session, href: &str) -> Result<Self> {
        let org: Org = session.fetch_as(href, None).await?;
        Ok(Self::new(session, org))
    }

    /// Fetch an org by identifier.
    pub async fn get_by_id(session: Session, id: &OrgId) -> Result<Self> {
        let href = org_href(&session, id);
        Self::get(session, &href).await
    }

    /// The session this client uses.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Snapshot of the current org document.
    pub async fn org(&self) -> Org {
        self.org.read().await.clone()
    }

    /// Re-fetch the org document.
    pub async fn refresh(&self) -> Result<()> {
        let href = self.org.read().await.href.clone();
        if href.is_empty() {
            return Err(Error::InvalidRequest("org has no HREF".to_string()));
        }
        let fresh: Org = self.session.fetch_as(&href, None).await?;
        *self.org.write().await = fresh;
        Ok(())
    }

    async fn links(&self, refresh: bool) -> Result<Vec<Link>> {
        if refresh {
            self.refresh().await?;
        }
        Ok(self.org.read().await.link.clone())
    }

    fn resolver(&self) -> Resolver {
        Resolver::with_predicate(self.session.id_predicate())
    }

    /// Fetch a catalog by HREF.
    pub async fn get_catalog_by_href(&self, href: &str) -> Result<Catalog> {
        self.session.fetch_as(href, None).await
    }

    /// Find the catalog with this name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if none matches, [`Error::Ambiguous`] if several do.
    pub async fn get_catalog_by_name(&self, name: &str, refresh: bool) -> Result<Catalog> {
        let links = self.links(refresh).await?;
        let matches = links
            .iter()
            .filter(|link| link.has_name(name) && is_catalog(link))
            .collect();
        let link = unique_match("catalog", name, matches)?;
        self.get_catalog_by_href(&link.href).await
    }

    /// Find the catalog with this URN, UUID or HREF.
    pub async fn get_catalog_by_id(&self, id: &str, refresh: bool) -> Result<Catalog> {
        let links = self.links(refresh).await?;
        let link = links
            .iter()
            .filter(|link| is_catalog(link))
            .find(|link| equal_ids(id, link.id_or_empty(), &link.href))
            .ok_or_else(|| Error::NotFound(format!("catalog '{id}'")))?;
        self.get_catalog_by_href(&link.href).await
    }

    /// Find a catalog by name or identifier.
    pub async fn get_catalog_by_name_or_id(&self, identifier: &str, refresh: bool) -> Result<Catalog> {
        self.resolver()
            .resolve(
                identifier,
                refresh,
                |name, refresh| async move { self.get_catalog_by_name(&name, refresh).await },
                |id, refresh| async move { self.get_catalog_by_id(&id, refresh).await },
            )
            .await
    }

    /// Query the catalogs of this org.
    ///
    /// System administrators read the `adminCatalog` query and its
    /// `adminCatalogRecord` rows; tenants read `catalog` and `catalogRecord`.
    /// All pages are collected.
    pub async fn query_catalog_list(&self) -> Result<Vec<CatalogRecord>> {
        let org_name = self.org.read().await.name.clone();
        let sys_admin = self.session.is_sys_admin();
        let query_type = if sys_admin {
            QUERY_TYPE_ADMIN_CATALOG
        } else {
            QUERY_TYPE_CATALOG
        };
        let encoded_name: String = form_urlencoded::byte_serialize(org_name.as_bytes()).collect();
        let filter = format!("orgName=={encoded_name}");
        let page_size = DEFAULT_PAGE_SIZE.to_string();
        debug!(org = %org_name, query_type, "querying catalog list");

        let mut catalogs = Vec::new();
        let mut page: u32 = 1;
        loop {
            let page_number = page.to_string();
            let href = with_query(
                QUERY_PATH,
                &[
                    ("type", query_type),
                    ("filter", filter.as_str()),
                    ("filterEncoded", "true"),
                    ("page", page_number.as_str()),
                    ("pageSize", page_size.as_str()),
                ],
            );
            let current: QueryResultRecords = self.session.fetch_as(&href, None).await?;
            let total = current.total;
            let records = current.into_catalog_records(sys_admin);
            trace!(page, rows = records.len(), ?total, "fetched catalog query page");

            let exhausted = records.is_empty();
            catalogs.extend(records);
            let complete = total.map_or(true, |total| catalogs.len() >= total as usize);
            if exhausted || complete {
                return Ok(catalogs);
            }
            page += 1;
        }
    }

    /// Fetch a VDC by HREF.
    pub async fn get_vdc_by_href(&self, href: &str) -> Result<VdcClient> {
        VdcClient::get(self.session.clone(), href).await
    }

    /// Find the VDC with this name.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if none matches, [`Error::Ambiguous`] if several do.
    pub async fn get_vdc_by_name(&self, name: &str, refresh: bool) -> Result<VdcClient> {
        let links = self.links(refresh).await?;
        let matches = links
            .iter()
            .filter(|link| link.has_name(name) && is_vdc(link))
            .collect();
        let link = unique_match("vdc", name, matches)?;
        self.get_vdc_by_href(&link.href).await
    }

    /// Find the VDC with this URN, UUID or HREF.
    pub async fn get_vdc_by_id(&self, id: &str, refresh: bool) -> Result<VdcClient> {
        let links = self.links(refresh).await?;
        let link = links
            .iter()
            .filter(|link| is_vdc(link))
            .find(|link| equal_ids(id, link.id_or_empty(), &link.href))
            .ok_or_else(|| Error::NotFound(format!("vdc '{id}'")))?;
        self.get_vdc_by_href(&link.href).await
    }

    /// Find a VDC by name or identifier.
    pub async fn get_vdc_by_name_or_id(&self, identifier: &str, refresh: bool) -> Result<VdcClient> {
        self.resolver()
            .resolve(
                identifier,
                refresh,
                |name, refresh| async move { self.get_vdc_by_name(&name, refresh).await },
                |id, refresh| async move { self.get_vdc_by_id(&id, refresh).await },
            )
            .await
    }

    /// Fetch a VDC compute policy.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedEndpoint`] if the server predates compute policies.
    pub async fn get_vdc_compute_policy_by_id(&self, id: &str) -> Result<VdcComputePolicy> {
        if id.is_empty() {
            return Err(Error::InvalidRequest("empty compute policy id".to_string()));
        }
        let version = self
            .session
            .check_endpoint_compatibility(ENDPOINT_VDC_COMPUTE_POLICIES)
            .await?;
        let href = self
            .session
            .openapi_href(&format!("{ENDPOINT_VDC_COMPUTE_POLICIES}{id}"));
        self.session.fetch_as(&href, Some(version)).await
    }

    /// List VDC compute policies, optionally filtered with OpenAPI query pairs.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedEndpoint`] if the server predates compute policies.
    pub async fn get_all_vdc_compute_policies(
        &self,
        filters: &[(&str, &str)],
    ) -> Result<Vec<VdcComputePolicy>> {
        let version = self
            .session
            .check_endpoint_compatibility(ENDPOINT_VDC_COMPUTE_POLICIES)
            .await?;
        let href = self.session.openapi_href(ENDPOINT_VDC_COMPUTE_POLICIES);
        let policies = get_all_items(&self.session, &href, version, filters).await?;
        debug!(count = policies.len(), "listed VDC compute policies");
        Ok(policies)
    }

    /// Fetch the org's task list.
    pub async fn get_task_list(&self) -> Result<TasksList> {
        let links = self.links(false).await?;
        let link = links
            .iter()
            .find(|link| link.rel == "down" && link.is_type(MIME_TASKS_LIST))
            .ok_or_else(|| Error::NotFound("task list link".to_string()))?;
        self.session.fetch_as(&link.href, None).await
    }
}

fn is_catalog(link: &Link) -> bool {
    link.is_type(MIME_CATALOG) || link.is_type(MIME_ADMIN_CATALOG)
}

fn is_vdc(link: &Link) -> bool {
    link.is_type(MIME_VDC) || link.is_type(MIME_ADMIN_VDC)
}
