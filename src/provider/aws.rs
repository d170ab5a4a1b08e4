//! EC2 managed prefix lists via the AWS SDK.
//!
//! # Responsibilities
//! - Load base credentials from the default chain (env, shared profile, IMDS, ...)
//! - Optionally switch to a named shared-config profile
//! - Optionally layer an STS assume-role step on top of the base credentials
//! - Translate SDK calls and errors into the provider traits

use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use std::sync::Arc;

use crate::provider::{
    AuthError, CredentialRequest, CredentialResolver, EntryPage, ListSummary, PrefixEntry,
    PrefixListProvider, ProviderError,
};

const ASSUME_ROLE_SESSION_NAME: &str = "prefix-list-source";
const DESCRIBE_PAGE_SIZE: i32 = 100;

/// EC2 client wrapper implementing [`PrefixListProvider`].
#[derive(Debug, Clone)]
pub struct Ec2PrefixLists {
    client: Client,
}

impl Ec2PrefixLists {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PrefixListProvider for Ec2PrefixLists {
    async fn describe_lists(&self, name_filter: &str) -> Result<Vec<ListSummary>, ProviderError> {
        let filter = Filter::builder()
            .name("prefix-list-name")
            .values(name_filter)
            .build();

        let mut lists = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .describe_managed_prefix_lists()
                .filters(filter.clone())
                .max_results(DESCRIBE_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(provider_error)?;

            lists.extend(output.prefix_lists().iter().filter_map(|list| {
                Some(ListSummary {
                    id: list.prefix_list_id()?.to_string(),
                    name: list.prefix_list_name()?.to_string(),
                })
            }));

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(lists)
    }

    async fn get_list_entries(
        &self,
        list_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<EntryPage, ProviderError> {
        let output = self
            .client
            .get_managed_prefix_list_entries()
            .prefix_list_id(list_id)
            .max_results(i32::try_from(max_results).unwrap_or(i32::MAX))
            .set_next_token(page_token.map(str::to_owned))
            .send()
            .await
            .map_err(provider_error)?;

        Ok(EntryPage {
            entries: output
                .entries()
                .iter()
                .map(|entry| PrefixEntry {
                    cidr: entry.cidr().map(str::to_owned),
                })
                .collect(),
            next_token: output.next_token().map(str::to_owned),
        })
    }
}

fn provider_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ProviderError::Transport(message)
        }
        _ => classify_error_code(err.code(), message),
    }
}

/// Map an EC2 error code to a [`ProviderError`] kind.
fn classify_error_code(code: Option<&str>, message: String) -> ProviderError {
    match code {
        Some("UnauthorizedOperation" | "AuthFailure") => ProviderError::Unauthorized(message),
        Some("RequestLimitExceeded" | "Throttling") => ProviderError::Throttled(message),
        _ => ProviderError::Service(message),
    }
}

/// Resolves credentials with `aws-config` and hands out [`Ec2PrefixLists`] clients.
#[derive(Debug, Clone, Default)]
pub struct AwsCredentials;

impl AwsCredentials {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialResolver for AwsCredentials {
    async fn resolve(
        &self,
        request: &CredentialRequest,
    ) -> Result<Arc<dyn PrefixListProvider>, AuthError> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(request.region.clone()));
        if let Some(profile) = &request.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        if sdk_config.credentials_provider().is_none() {
            return Err(AuthError::NoCredentials {
                region: request.region.clone(),
            });
        }

        let mut builder = aws_sdk_ec2::config::Builder::from(&sdk_config);
        if let Some(role_arn) = &request.role_arn {
            let assume_role = AssumeRoleProvider::builder(role_arn)
                .session_name(ASSUME_ROLE_SESSION_NAME)
                .configure(&sdk_config)
                .build()
                .await;
            builder = builder.credentials_provider(assume_role);
        }

        tracing::debug!(
            region = %request.region,
            profile = ?request.profile,
            role_arn = ?request.role_arn,
            "AWS client configured"
        );

        Ok(Arc::new(Ec2PrefixLists::new(Client::from_conf(builder.build()))))
    }
}
