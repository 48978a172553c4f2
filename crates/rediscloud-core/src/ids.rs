//! Composite resource id codecs
//!
//! External ids are slash-delimited positive decimals. The formats here are
//! an import contract: parsing is strict and a malformed id is a fatal
//! error, never auto-repaired.

use crate::error::{CoreError, Result};

fn parse_parts(id: &str, expected: &[usize]) -> Result<Vec<i64>> {
    let parts: Vec<&str> = id.split('/').collect();
    if !expected.contains(&parts.len()) {
        return Err(CoreError::InvalidId(id.to_string()));
    }
    parts
        .iter()
        .map(|part| {
            part.parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| CoreError::InvalidId(id.to_string()))
        })
        .collect()
}

/// `{subscription}/{database}`
pub fn build_database_id(subscription: i64, database: i64) -> String {
    format!("{subscription}/{database}")
}

pub fn parse_database_id(id: &str) -> Result<(i64, i64)> {
    let parts = parse_parts(id, &[2])?;
    Ok((parts[0], parts[1]))
}

/// `{subscription}/{peering}`
pub fn build_peering_id(subscription: i64, peering: i64) -> String {
    format!("{subscription}/{peering}")
}

pub fn parse_peering_id(id: &str) -> Result<(i64, i64)> {
    let parts = parse_parts(id, &[2])?;
    Ok((parts[0], parts[1]))
}

/// `{subscription}/{region}`: active-active PrivateLink and PSC service
pub fn build_regional_id(subscription: i64, region: i64) -> String {
    format!("{subscription}/{region}")
}

pub fn parse_regional_id(id: &str) -> Result<(i64, i64)> {
    let parts = parse_parts(id, &[2])?;
    Ok((parts[0], parts[1]))
}

/// `{subscription}[/{region}]/{tgw}`: Transit Gateway attachment
pub fn build_tgw_attachment_id(subscription: i64, region: Option<i64>, tgw: i64) -> String {
    match region {
        Some(region) => format!("{subscription}/{region}/{tgw}"),
        None => format!("{subscription}/{tgw}"),
    }
}

pub fn parse_tgw_attachment_id(id: &str) -> Result<(i64, Option<i64>, i64)> {
    let parts = parse_parts(id, &[2, 3])?;
    match parts.as_slice() {
        [subscription, tgw] => Ok((*subscription, None, *tgw)),
        [subscription, region, tgw] => Ok((*subscription, Some(*region), *tgw)),
        _ => unreachable!("parse_parts bounds the arity"),
    }
}

/// `{subscription}[/{region}]/{invitation}`: TGW invitation acceptor
pub fn build_invitation_id(subscription: i64, region: Option<i64>, invitation: i64) -> String {
    build_tgw_attachment_id(subscription, region, invitation)
}

pub fn parse_invitation_id(id: &str) -> Result<(i64, Option<i64>, i64)> {
    parse_tgw_attachment_id(id)
}

/// Parsed PSC endpoint id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PscEndpointId {
    pub subscription: i64,
    pub region: Option<i64>,
    pub service: i64,
    pub endpoint: i64,
}

/// `{subscription}/{service}/{endpoint}` (Pro) or
/// `{subscription}/{region}/{service}/{endpoint}` (active-active)
pub fn build_psc_endpoint_id(id: &PscEndpointId) -> String {
    match id.region {
        Some(region) => format!(
            "{}/{}/{}/{}",
            id.subscription, region, id.service, id.endpoint
        ),
        None => format!("{}/{}/{}", id.subscription, id.service, id.endpoint),
    }
}

pub fn parse_psc_endpoint_id(id: &str) -> Result<PscEndpointId> {
    let parts = parse_parts(id, &[3, 4])?;
    match parts.as_slice() {
        [subscription, service, endpoint] => Ok(PscEndpointId {
            subscription: *subscription,
            region: None,
            service: *service,
            endpoint: *endpoint,
        }),
        [subscription, region, service, endpoint] => Ok(PscEndpointId {
            subscription: *subscription,
            region: Some(*region),
            service: *service,
            endpoint: *endpoint,
        }),
        _ => unreachable!("parse_parts bounds the arity"),
    }
}

/// Single integer id used by subscriptions, ACL entities, cloud accounts.
pub fn parse_scalar_id(id: &str) -> Result<i64> {
    Ok(parse_parts(id, &[1])?[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_id_round_trips() {
        let id = build_database_id(1234, 5678);
        assert_eq!(id, "1234/5678");
        assert_eq!(parse_database_id(&id).unwrap(), (1234, 5678));
    }

    #[test]
    fn peering_id_round_trips() {
        let id = build_peering_id(1, 2);
        assert_eq!(parse_peering_id(&id).unwrap(), (1, 2));
    }

    #[test]
    fn tgw_id_round_trips_both_arities() {
        let pro = build_tgw_attachment_id(10, None, 30);
        assert_eq!(pro, "10/30");
        assert_eq!(parse_tgw_attachment_id(&pro).unwrap(), (10, None, 30));

        let aa = build_tgw_attachment_id(10, Some(20), 30);
        assert_eq!(aa, "10/20/30");
        assert_eq!(parse_tgw_attachment_id(&aa).unwrap(), (10, Some(20), 30));
    }

    #[test]
    fn psc_endpoint_id_round_trips_both_arities() {
        let pro = PscEndpointId {
            subscription: 1,
            region: None,
            service: 2,
            endpoint: 3,
        };
        assert_eq!(build_psc_endpoint_id(&pro), "1/2/3");
        assert_eq!(parse_psc_endpoint_id("1/2/3").unwrap(), pro);

        let aa = PscEndpointId {
            subscription: 1,
            region: Some(4),
            service: 2,
            endpoint: 3,
        };
        assert_eq!(build_psc_endpoint_id(&aa), "1/4/2/3");
        assert_eq!(parse_psc_endpoint_id("1/4/2/3").unwrap(), aa);
    }

    #[test]
    fn scalar_id_parses() {
        assert_eq!(parse_scalar_id("42").unwrap(), 42);
        assert!(parse_scalar_id("42/1").is_err());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in [
            "",
            "/",
            "1/",
            "/2",
            "a/b",
            "1/b",
            "1//2",
            "1/2/3/4/5",
            "-1/2",
            "0/2",
            "1/ 2",
            "1.5/2",
            "99999999999999999999/2",
        ] {
            assert!(parse_database_id(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn invalid_error_carries_original_id() {
        let err = parse_database_id("not/an-id").unwrap_err();
        match err {
            CoreError::InvalidId(id) => assert_eq!(id, "not/an-id"),
            other => panic!("unexpected: {other}"),
        }
    }
}
