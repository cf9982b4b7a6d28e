// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn host_pattern_turns_ipv4_cidr_into_wildcard() {
    assert_eq!(host_pattern("10.20.0.0/16").unwrap(), "10.20.%.%");
    assert_eq!(host_pattern("10.20.30.40/32").unwrap(), "10.20.30.40");
}

#[test]
fn host_pattern_keeps_ipv6_cidr_suffix() {
    assert_eq!(host_pattern("fd00::/16").unwrap(), "fd00::/16");
}

#[tokio::test]
async fn converge_user_rejects_privileges_outside_the_allow_list() {
    let mgr = DatabaseManager::new("mysql");
    let cancel = CancellationToken::new();
    let user = DesiredUser {
        name: "app".to_string(),
        password: "secret".to_string(),
        privileges: vec!["SUPER".to_string()],
        access_cidrs: Vec::new(),
    };
    let err = mgr.converge_user("shopdb", &user, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}

#[tokio::test]
async fn converge_rejects_invalid_database_name() {
    let mgr = DatabaseManager::new("mysql");
    let cancel = CancellationToken::new();
    let database = DesiredDatabase {
        name: "bad name!".to_string(),
        users: Vec::new(),
    };
    let err = mgr.converge(&database, &cancel).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}
