//! CLI commands

use anyhow::Result;
use clap::{Args, Subcommand};
use cuic_client::{ClientConfig, ClientError, CuicClient};
use cuic_core::{EntityFamily, EntityKind, GrantRequest, PermissionLevel, Subject, SubjectKind};
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use tracing::{info, warn};

#[derive(Subcommand)]
pub enum Commands {
    /// List entities of one kind
    Entities {
        /// Entity kind name or numeric code (e.g. report-folder, 2)
        kind: EntityKind,

        /// Include system collections
        #[arg(long)]
        system: bool,
    },

    /// List the users and groups that can receive grants
    Directory,

    /// Show the grants on one object
    Get {
        kind: EntityKind,

        object_id: String,

        /// Show group grants instead of user grants
        #[arg(long)]
        group: bool,
    },

    /// Grant a permission level on one object
    Set {
        kind: EntityKind,

        object_id: String,

        #[command(flatten)]
        grant: GrantArgs,
    },

    /// Grant a permission level on every entity of a family
    Propagate {
        /// reports, report-definitions or dashboards
        family: EntityFamily,

        #[command(flatten)]
        grant: GrantArgs,
    },
}

#[derive(Args)]
pub struct GrantArgs {
    /// Permission level: none, execute (x), all (write, a, w) or 0, 3, 7
    #[arg(short = 'L', long)]
    level: PermissionLevel,

    #[command(flatten)]
    subject: SubjectArgs,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SubjectArgs {
    /// User ids receiving the grant
    #[arg(long = "user", num_args = 1..)]
    users: Vec<String>,

    /// Group id receiving the grant
    #[arg(long)]
    group: Option<String>,
}

impl SubjectArgs {
    fn into_subject(self) -> Result<Subject> {
        match self.group {
            Some(group) => Ok(Subject::group(group)),
            None => Ok(Subject::users(self.users)?),
        }
    }
}

impl Commands {
    /// Run the command; `Ok(false)` means it completed with per-item failures
    pub async fn execute(self, config: &ClientConfig) -> Result<bool> {
        let client = CuicClient::new(config)?;

        match self {
            Self::Entities { kind, system } => {
                let listing =
                    with_session_retry(&client, || client.list_entities(kind, system)).await?;
                print_json(&listing)?;
            }
            Self::Directory => {
                let directory =
                    with_session_retry(&client, || client.list_users_and_groups()).await?;
                print_json(&directory)?;
            }
            Self::Get {
                kind,
                object_id,
                group,
            } => {
                let subject_kind = if group {
                    SubjectKind::Group
                } else {
                    SubjectKind::User
                };
                let grants = with_session_retry(&client, || {
                    client.get_permission(kind, &object_id, subject_kind)
                })
                .await?;
                print_json(&grants)?;
            }
            Self::Set {
                kind,
                object_id,
                grant,
            } => {
                let request =
                    GrantRequest::new(grant.subject.into_subject()?, kind, object_id, grant.level);
                with_session_retry(&client, || client.set_permission(&request)).await?;
                print_json(&json!({
                    "objectId": request.object_id,
                    "entityType": request.entity_kind,
                    "subject": request.subject,
                    "level": request.level,
                    "saved": true,
                }))?;
            }
            Self::Propagate { family, grant } => {
                let subject = grant.subject.into_subject()?;
                let report = with_session_retry(&client, || {
                    client.propagate_family(grant.level, family, &subject)
                })
                .await?;

                info!(
                    %family,
                    succeeded = report.succeeded(),
                    failed = report.failed(),
                    "Propagation complete"
                );
                print_json(&json!({
                    "outcomes": report.outcomes,
                    "summary": {
                        "succeeded": report.succeeded(),
                        "failed": report.failed(),
                    },
                }))?;
                return Ok(report.is_complete_success());
            }
        }

        Ok(true)
    }
}

/// Run `operation`, re-authenticating and retrying once if the session expired
async fn with_session_retry<T, F, Fut>(client: &CuicClient, operation: F) -> Result<T, ClientError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    match operation().await {
        Err(e) if e.is_session_expired() => {
            warn!(error = %e, "Session expired, retrying once");
            client.invalidate_session().await;
            operation().await
        }
        result => result,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse(args: &[&str]) -> Result<Commands, clap::Error> {
        TestCli::try_parse_from(std::iter::once("cuic").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn test_set_with_single_user() {
        let Commands::Set {
            kind,
            object_id,
            grant,
        } = parse(&["set", "report", "OBJ1", "--level", "x", "--user", "U1"]).unwrap()
        else {
            panic!("expected set");
        };
        assert_eq!(kind, EntityKind::Report);
        assert_eq!(object_id, "OBJ1");
        assert_eq!(grant.level, PermissionLevel::Execute);
        assert_eq!(
            grant.subject.into_subject().unwrap(),
            Subject::Users(vec!["U1".to_string()])
        );
    }

    #[test]
    fn test_propagate_to_group() {
        let Commands::Propagate { family, grant } =
            parse(&["propagate", "dashboards", "-L", "7", "--group", "G1"]).unwrap()
        else {
            panic!("expected propagate");
        };
        assert_eq!(family, EntityFamily::Dashboards);
        assert_eq!(grant.level, PermissionLevel::All);
        assert_eq!(grant.subject.into_subject().unwrap(), Subject::group("G1"));
    }

    #[test]
    fn test_subject_is_required_and_exclusive() {
        assert!(parse(&["set", "report", "OBJ1", "--level", "x"]).is_err());
        assert!(
            parse(&[
                "set", "report", "OBJ1", "--level", "x", "--user", "U1", "--group", "G1"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        assert!(parse(&["set", "report", "OBJ1", "--level", "owner", "--user", "U1"]).is_err());
    }

    mod session_retry {
        use super::*;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const PROBE: &str = "/cuic/rest/crossdomain";
        const SECURITY: &str = "/cuic/security/SecurityPermissions.htmx";

        async fn mount_probe(server: &MockServer, times: u64) {
            Mock::given(method("GET"))
                .and(path(PROBE))
                .respond_with(
                    ResponseTemplate::new(200)
                        .append_header("set-cookie", "JSESSIONID=A1; Path=/cuic")
                        .append_header("set-cookie", "JSESSIONIDSSO=B2; Path=/")
                        .append_header("set-cookie", "XSRF-TOKEN=C3; Path=/"),
                )
                .expect(times)
                .mount(server)
                .await;
        }

        fn redirect_to_login() -> ResponseTemplate {
            ResponseTemplate::new(302).append_header("location", "/cuic/Login.htmx")
        }

        fn client_for(server: &MockServer) -> CuicClient {
            CuicClient::builder()
                .host("127.0.0.1")
                .username("admin")
                .password("secret")
                .base_url(server.uri())
                .throttle(Duration::ZERO)
                .build()
                .unwrap()
        }

        #[tokio::test]
        async fn test_expired_session_is_renewed_and_retried_once() {
            let server = MockServer::start().await;
            mount_probe(&server, 2).await;
            Mock::given(method("POST"))
                .and(path(SECURITY))
                .respond_with(redirect_to_login())
                .up_to_n_times(1)
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path(SECURITY))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "returnCode": "0",
                    "entityData": [{"id": "R1"}]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server);
            let listing = with_session_retry(&client, || client.list_reports())
                .await
                .unwrap();
            assert_eq!(listing.entities().unwrap()[0].id, "R1");
        }

        #[tokio::test]
        async fn test_second_expiry_is_returned_not_retried() {
            let server = MockServer::start().await;
            mount_probe(&server, 2).await;
            Mock::given(method("POST"))
                .and(path(SECURITY))
                .respond_with(redirect_to_login())
                .expect(2)
                .mount(&server)
                .await;

            let client = client_for(&server);
            let err = with_session_retry(&client, || client.list_reports())
                .await
                .unwrap_err();
            assert!(err.is_session_expired());
        }

        #[tokio::test]
        async fn test_other_errors_are_not_retried() {
            let server = MockServer::start().await;
            mount_probe(&server, 1).await;
            Mock::given(method("POST"))
                .and(path(SECURITY))
                .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_for(&server);
            let err = with_session_retry(&client, || client.list_reports())
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Status { status: 500, .. }));
        }
    }

    #[test]
    fn test_entities_accepts_numeric_kind() {
        let Commands::Entities { kind, system } = parse(&["entities", "9", "--system"]).unwrap()
        else {
            panic!("expected entities");
        };
        assert_eq!(kind, EntityKind::Collection);
        assert!(system);
    }
}
