use clave_license::{LicenseError, RepositoryError};
use clave_server::Problem;

fn status_of(err: LicenseError) -> u16 {
    Problem::from_license_error(&err, "/x").status
}

#[test]
fn status_mapping() {
    assert_eq!(status_of(LicenseError::InvalidInput("x".into())), 400);
    assert_eq!(status_of(LicenseError::InvalidToken("x".into())), 401);
    assert_eq!(status_of(LicenseError::Unverified), 401);
    assert_eq!(status_of(LicenseError::NotFound), 404);
    assert_eq!(status_of(LicenseError::LicenseExpired), 403);
    assert_eq!(status_of(LicenseError::DeviceMismatch), 403);
    assert_eq!(status_of(LicenseError::QuotaExceeded { max: 2 }), 409);
    assert_eq!(status_of(LicenseError::Cancelled), 503);
    assert_eq!(status_of(LicenseError::ServerMisconfigured("x".into())), 500);
}

#[test]
fn internal_failures_are_opaque() {
    let err = LicenseError::Storage(RepositoryError::Backend("disk I/O at /var/db".into()));
    let problem = Problem::from_license_error(&err, "/api/v1/activate");
    assert_eq!(problem.status, 500);
    assert_eq!(problem.title, "Internal server error");
    assert_eq!(problem.detail, None);
    assert_eq!(problem.instance, "/api/v1/activate");
}

#[test]
fn problem_serializes_type_field() {
    let problem = Problem::from_license_error(&LicenseError::NotFound, "/api/v1/activate");
    let json = serde_json::to_value(&problem).unwrap();
    assert_eq!(json["type"], "about:blank");
    assert_eq!(json["title"], "License not found");
    assert_eq!(json["status"], 404);
    assert!(json.get("detail").is_none());
}
