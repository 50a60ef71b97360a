//! Volunteer organization, opportunity, and shift queries.
//!
//! Opportunities carry no tenant column of their own; tenancy flows through
//! the owning organization, and every lookup joins through it. Search only
//! surfaces active opportunities whose organization has been approved.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use commune_common::{
    CategoryId, Error, OpportunityId, OrganizationId, OrganizationStatus, Result, ShiftId,
    TenantId, UserId,
};

use crate::models::{OpportunityListing, VolOpportunity, VolOrganization, VolShift};
use crate::queries::clamp_limit;

const ORG_COLS: &str = "id, tenant_id, user_id, name, description, logo_url, status, created_at";

const OPP_COLS: &str = "o.id, o.organization_id, o.category_id, o.title, o.description, \
                        o.location, o.is_remote, o.is_active, o.created_at";

const SHIFT_COLS: &str = "id, opportunity_id, starts_at, ends_at, capacity, created_at";

/// Fields for a new opportunity.
#[derive(Debug, Clone)]
pub struct NewOpportunity<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category_id: Option<CategoryId>,
    pub location: Option<&'a str>,
    pub is_remote: bool,
}

/// Search filters. `search` matches the opportunity title, its description,
/// or the organization name with a substring match.
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter<'a> {
    pub search: Option<&'a str>,
    pub category: Option<CategoryId>,
    pub organization: Option<OrganizationId>,
    pub remote_only: bool,
    pub include_inactive: bool,
    pub limit: Option<i64>,
}

/// Register a volunteer organization. New organizations start in `Pending`
/// status and stay invisible to search until approved.
pub fn create_organization(
    conn: &Connection,
    tenant: TenantId,
    user: UserId,
    name: &str,
    description: &str,
    logo_url: Option<&str>,
) -> Result<VolOrganization> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("organization needs a name"));
    }

    let now = Utc::now();

    conn.execute(
        "INSERT INTO vol_organizations (tenant_id, user_id, name, description, logo_url, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tenant.as_i64(),
            user.as_i64(),
            name,
            description,
            logo_url,
            OrganizationStatus::Pending.to_string(),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VolOrganization {
        id: OrganizationId::new(conn.last_insert_rowid()),
        tenant_id: tenant,
        user_id: user,
        name: name.to_string(),
        description: description.to_string(),
        logo_url: logo_url.map(str::to_string),
        status: OrganizationStatus::Pending,
        created_at: now,
    })
}

/// Get an organization by id, scoped to the tenant.
pub fn get_organization(
    conn: &Connection,
    tenant: TenantId,
    id: OrganizationId,
) -> Result<Option<VolOrganization>> {
    let q = format!("SELECT {ORG_COLS} FROM vol_organizations WHERE id = ?1 AND tenant_id = ?2");
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        VolOrganization::from_row,
    );

    match result {
        Ok(org) => Ok(Some(org)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Set an organization's review status. Returns whether a row was updated.
pub fn set_organization_status(
    conn: &Connection,
    tenant: TenantId,
    id: OrganizationId,
    status: OrganizationStatus,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE vol_organizations SET status = ?1 WHERE id = ?2 AND tenant_id = ?3",
            rusqlite::params![status.to_string(), id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Post a new opportunity for an organization. Fails with `NotFound` when
/// the organization does not exist in this tenant.
pub fn create_opportunity(
    conn: &Connection,
    tenant: TenantId,
    organization: OrganizationId,
    opportunity: &NewOpportunity<'_>,
) -> Result<VolOpportunity> {
    if opportunity.title.trim().is_empty() {
        return Err(Error::invalid_input("opportunity needs a title"));
    }

    get_organization(conn, tenant, organization)?
        .ok_or_else(|| Error::not_found("organization"))?;

    let now = Utc::now();

    conn.execute(
        "INSERT INTO vol_opportunities (organization_id, category_id, title, description, location, is_remote, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            organization.as_i64(),
            opportunity.category_id.map(CategoryId::as_i64),
            opportunity.title,
            opportunity.description,
            opportunity.location,
            i64::from(opportunity.is_remote),
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VolOpportunity {
        id: OpportunityId::new(conn.last_insert_rowid()),
        organization_id: organization,
        category_id: opportunity.category_id,
        title: opportunity.title.to_string(),
        description: opportunity.description.to_string(),
        location: opportunity.location.map(str::to_string),
        is_remote: opportunity.is_remote,
        is_active: true,
        created_at: now,
    })
}

/// Get an opportunity by id, scoped to the tenant through its organization.
pub fn get_opportunity(
    conn: &Connection,
    tenant: TenantId,
    id: OpportunityId,
) -> Result<Option<VolOpportunity>> {
    let q = format!(
        "SELECT {OPP_COLS} FROM vol_opportunities o
         JOIN vol_organizations org ON org.id = o.organization_id
         WHERE o.id = ?1 AND org.tenant_id = ?2"
    );
    let result = conn.query_row(
        &q,
        rusqlite::params![id.as_i64(), tenant.as_i64()],
        VolOpportunity::from_row,
    );

    match result {
        Ok(opp) => Ok(Some(opp)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Search opportunities of approved organizations, newest first. Inactive
/// opportunities are skipped unless the filter asks for them.
pub fn search(
    conn: &Connection,
    tenant: TenantId,
    filter: &OpportunityFilter<'_>,
) -> Result<Vec<OpportunityListing>> {
    let mut sql = format!(
        "SELECT {OPP_COLS}, org.name, c.name
         FROM vol_opportunities o
         JOIN vol_organizations org ON org.id = o.organization_id
         LEFT JOIN categories c ON c.id = o.category_id
         WHERE org.tenant_id = ?1 AND org.status = 'approved'"
    );
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(tenant.as_i64())];

    if !filter.include_inactive {
        sql.push_str(" AND o.is_active = 1");
    }

    if let Some(term) = filter.search {
        params.push(Box::new(format!("%{}%", term)));
        let n = params.len();
        sql.push_str(&format!(
            " AND (o.title LIKE ?{n} OR o.description LIKE ?{n} OR org.name LIKE ?{n})"
        ));
    }
    if let Some(category) = filter.category {
        params.push(Box::new(category.as_i64()));
        sql.push_str(&format!(" AND o.category_id = ?{}", params.len()));
    }
    if let Some(organization) = filter.organization {
        params.push(Box::new(organization.as_i64()));
        sql.push_str(&format!(" AND o.organization_id = ?{}", params.len()));
    }
    if filter.remote_only {
        sql.push_str(" AND o.is_remote = 1");
    }

    params.push(Box::new(clamp_limit(
        filter.limit.unwrap_or(crate::queries::MAX_PAGE_SIZE),
    )));
    sql.push_str(&format!(
        " ORDER BY o.created_at DESC, o.id DESC LIMIT ?{}",
        params.len()
    ));

    let mut stmt = conn.prepare(&sql).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
            OpportunityListing::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Take an opportunity off the listings. Returns whether a row was updated.
pub fn deactivate_opportunity(
    conn: &Connection,
    tenant: TenantId,
    id: OpportunityId,
) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE vol_opportunities SET is_active = 0
             WHERE id = ?1 AND organization_id IN
                 (SELECT id FROM vol_organizations WHERE tenant_id = ?2)",
            rusqlite::params![id.as_i64(), tenant.as_i64()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(n > 0)
}

/// Add a shift to an opportunity. `capacity` of `None` means unlimited.
pub fn create_shift(
    conn: &Connection,
    tenant: TenantId,
    opportunity: OpportunityId,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    capacity: Option<i64>,
) -> Result<VolShift> {
    if ends_at <= starts_at {
        return Err(Error::invalid_input("shift must end after it starts"));
    }
    if capacity.is_some_and(|c| c < 1) {
        return Err(Error::invalid_input("shift capacity must be at least one"));
    }

    get_opportunity(conn, tenant, opportunity)?.ok_or_else(|| Error::not_found("opportunity"))?;

    let now = Utc::now();

    conn.execute(
        "INSERT INTO vol_shifts (opportunity_id, starts_at, ends_at, capacity, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            opportunity.as_i64(),
            starts_at.to_rfc3339(),
            ends_at.to_rfc3339(),
            capacity,
            now.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(VolShift {
        id: ShiftId::new(conn.last_insert_rowid()),
        opportunity_id: opportunity,
        starts_at,
        ends_at,
        capacity,
        created_at: now,
    })
}

/// List an opportunity's shifts in start order.
pub fn list_shifts(
    conn: &Connection,
    tenant: TenantId,
    opportunity: OpportunityId,
) -> Result<Vec<VolShift>> {
    let q = format!(
        "SELECT {SHIFT_COLS} FROM vol_shifts
         WHERE opportunity_id = ?1 AND opportunity_id IN
             (SELECT o.id FROM vol_opportunities o
              JOIN vol_organizations org ON org.id = o.organization_id
              WHERE org.tenant_id = ?2)
         ORDER BY starts_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![opportunity.as_i64(), tenant.as_i64()],
            VolShift::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Number of approved applications holding a slot on a shift. Pending and
/// rejected applications do not count against capacity.
pub fn shift_signup_count(conn: &Connection, shift: ShiftId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM vol_applications WHERE shift_id = ?1 AND status = 'approved'",
        rusqlite::params![shift.as_i64()],
        |row| row.get(0),
    )
    .map_err(|e| Error::database(e.to_string()))
}
