//! Role injection pipeline tests.
//!
//! Runs `Injector` end to end against the scripted identity client: catalog
//! walk, credential fetch, environment construction, and child spawn.

use std::collections::BTreeMap;
use std::io;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use ssoenv::auth::{AuthMachine, BrowserLauncher, UrlAction};
use ssoenv::catalog::CatalogManager;
use ssoenv::core::config::{Config, Settings, SsoInstance};
use ssoenv::core::errors::ErrorKind;
use ssoenv::core::paths::SsoPaths;
use ssoenv::core::records::{AccessToken, RoleCredentials};
use ssoenv::core::types::{AccountId, RoleArn};
use ssoenv::identity::mock::MockIdentityClient;
use ssoenv::identity::{Account, Role};
use ssoenv::inject::{InjectError, Injector, RoleSelector};
use ssoenv::secrets::{store_key, MemoryBackend, SecureStore};

const REGION: &str = "us-east-1";
const START_URL: &str = "https://example.awsapps.com/start";

struct Fixture {
    _dir: TempDir,
    paths: SsoPaths,
    config: Config,
    store: SecureStore,
    launcher: BrowserLauncher,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = SsoPaths::new(dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.default_region = Some("eu-central-1".into());
        settings.sso.insert(
            "Default".into(),
            SsoInstance {
                start_url: START_URL.into(),
                sso_region: REGION.into(),
                ..SsoInstance::default()
            },
        );
        let config = Config::from_settings(settings).unwrap();

        let store = SecureStore::new(Box::new(MemoryBackend::new())).unwrap();
        store
            .save_token(
                &store_key(REGION, START_URL),
                &AccessToken {
                    access_token: "at".into(),
                    refresh_token: None,
                    token_type: "Bearer".into(),
                    expires_at: Utc::now() + Duration::hours(1),
                },
            )
            .unwrap();

        Self {
            _dir: dir,
            paths,
            config,
            store,
            launcher: BrowserLauncher::new(UrlAction::Print).with_output(Box::new(io::sink())),
        }
    }

    fn instance(&self) -> &SsoInstance {
        self.config.select_sso(Some("Default")).unwrap().1
    }
}

fn credentials() -> RoleCredentials {
    RoleCredentials {
        account_id: AccountId::new(42).unwrap(),
        role_name: "admin".into(),
        access_key_id: "AKIAEXAMPLE".into(),
        secret_access_key: "secret".into(),
        session_token: "session".into(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

fn walk(client: MockIdentityClient) -> MockIdentityClient {
    client
        .expect_list_accounts(Ok(vec![Account {
            account_id: AccountId::new(42).unwrap(),
            account_name: "production".into(),
            email_address: String::new(),
        }]))
        .expect_list_account_roles(Ok(vec![Role {
            account_id: AccountId::new(42).unwrap(),
            role_name: "admin".into(),
        }]))
}

#[tokio::test]
async fn existing_credentials_in_parent_block_the_run() {
    let fx = Fixture::new();
    let client = MockIdentityClient::new();
    let auth = AuthMachine::new(&client, &fx.store, REGION, START_URL);
    let catalogs = CatalogManager::new(&client, &fx.config, &fx.paths);
    let injector = Injector {
        client: &client,
        store: &fx.store,
        auth: &auth,
        launcher: &fx.launcher,
        catalogs: &catalogs,
        sso_name: "Default",
        instance: fx.instance(),
    };

    let parent: BTreeMap<String, String> = [("AWS_PROFILE".to_string(), "already-set".to_string())].into();
    let marker = fx.paths.base().join("spawned");
    let command = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        format!("touch {}", marker.display()),
    ];

    let err = injector
        .run(
            &RoleSelector::by_arn("arn:aws:iam::000000000042:role/admin"),
            &command,
            &parent,
            false,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InjectError::EnvironmentConflict(_)));
    assert_eq!(err.kind(), ErrorKind::EnvironmentConflict);
    assert!(client.calls().is_empty());
    assert!(!marker.exists());
}

#[tokio::test]
async fn account_is_zero_padded_in_arn_and_environment() {
    let fx = Fixture::new();
    let client = walk(MockIdentityClient::new()).expect_get_role_credentials(Ok(credentials()));
    let auth = AuthMachine::new(&client, &fx.store, REGION, START_URL);
    let catalogs = CatalogManager::new(&client, &fx.config, &fx.paths);
    let injector = Injector {
        client: &client,
        store: &fx.store,
        auth: &auth,
        launcher: &fx.launcher,
        catalogs: &catalogs,
        sso_name: "Default",
        instance: fx.instance(),
    };

    let prepared = injector
        .prepare(
            &RoleSelector::by_account_and_role("42", "admin"),
            &BTreeMap::new(),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        prepared.record.arn.to_string(),
        "arn:aws:iam::000000000042:role/admin"
    );
    assert_eq!(prepared.env["AWS_SSO_ACCOUNT_ID"], "000000000042");
    assert_eq!(prepared.env["AWS_SSO_ROLE_ARN"], "arn:aws:iam::000000000042:role/admin");
    assert_eq!(prepared.env["AWS_ACCESS_KEY_ID"], "AKIAEXAMPLE");
    assert_eq!(prepared.env["AWS_DEFAULT_REGION"], "eu-central-1");
    assert_eq!(prepared.env["AWS_SSO"], "Default");

    assert_eq!(
        catalogs.history(),
        vec!["arn:aws:iam::000000000042:role/admin".to_string()]
    );
    let arn = RoleArn::new(AccountId::new(42).unwrap(), "admin").unwrap();
    assert_eq!(fx.store.get_role_credentials(&arn).unwrap().access_key_id, "AKIAEXAMPLE");
}

#[tokio::test]
async fn second_run_uses_cached_catalog_and_credentials() {
    let fx = Fixture::new();
    let client = walk(MockIdentityClient::new()).expect_get_role_credentials(Ok(credentials()));
    let auth = AuthMachine::new(&client, &fx.store, REGION, START_URL);
    let catalogs = CatalogManager::new(&client, &fx.config, &fx.paths);
    let injector = Injector {
        client: &client,
        store: &fx.store,
        auth: &auth,
        launcher: &fx.launcher,
        catalogs: &catalogs,
        sso_name: "Default",
        instance: fx.instance(),
    };
    let selector = RoleSelector::by_profile("000000000042:admin");

    injector.prepare(&selector, &BTreeMap::new(), false).await.unwrap();
    let calls_after_first = client.calls().len();
    let again = injector.prepare(&selector, &BTreeMap::new(), true).await.unwrap();

    assert_eq!(client.calls().len(), calls_after_first);
    assert_eq!(again.env["AWS_SSO_DEFAULT_REGION"], "");
    assert!(!again.env.contains_key("AWS_DEFAULT_REGION"));
}

#[tokio::test]
async fn role_missing_from_catalog_is_input_error() {
    let fx = Fixture::new();
    let client = walk(MockIdentityClient::new());
    let auth = AuthMachine::new(&client, &fx.store, REGION, START_URL);
    let catalogs = CatalogManager::new(&client, &fx.config, &fx.paths);
    let injector = Injector {
        client: &client,
        store: &fx.store,
        auth: &auth,
        launcher: &fx.launcher,
        catalogs: &catalogs,
        sso_name: "Default",
        instance: fx.instance(),
    };

    let err = injector
        .prepare(
            &RoleSelector::by_account_and_role("42", "ops"),
            &BTreeMap::new(),
            false,
        )
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("ssoenv cache"));
}

#[cfg(unix)]
#[tokio::test]
async fn child_runs_with_injected_environment() {
    let fx = Fixture::new();
    let client = walk(MockIdentityClient::new()).expect_get_role_credentials(Ok(credentials()));
    let auth = AuthMachine::new(&client, &fx.store, REGION, START_URL);
    let catalogs = CatalogManager::new(&client, &fx.config, &fx.paths);
    let injector = Injector {
        client: &client,
        store: &fx.store,
        auth: &auth,
        launcher: &fx.launcher,
        catalogs: &catalogs,
        sso_name: "Default",
        instance: fx.instance(),
    };

    let parent: BTreeMap<String, String> = [("HOME".to_string(), "/home/test".to_string())].into();
    let command = vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        r#"[ "$AWS_SSO_ACCOUNT_ID" = 000000000042 ] && [ "$HOME" = /home/test ] && exit 7"#
            .to_string(),
    ];
    let code = injector
        .run(&RoleSelector::by_account_and_role("42", "admin"), &command, &parent, false)
        .await
        .unwrap();
    assert_eq!(code, 7);
}
