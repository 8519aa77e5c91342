//! Profile of the signed-in user

use super::models::{ProfileUpdate, UserProfile};
use super::ApiContext;
use crate::error::{StorefrontError, StorefrontResult};
use crate::query::{InvalidatePolicy, MutateOptions, QueryKey};
use crate::transport::ApiRequest;

#[derive(Clone)]
pub struct ProfileApi {
    ctx: ApiContext,
}

impl ProfileApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self) -> StorefrontResult<UserProfile> {
        let path = self.ctx.transport.api().current_user_path.clone();
        let request = ApiRequest::get(path).authenticated();
        self.ctx
            .read(&QueryKey::current_user(), self.ctx.fetch(request), None)
            .await
    }

    /// Partial update; the email address cannot be changed
    pub async fn update(&self, changes: &ProfileUpdate) -> StorefrontResult<UserProfile> {
        if changes.is_empty() {
            return Err(StorefrontError::User("No changes to save".to_string()));
        }

        let path = self.ctx.transport.api().current_user_path.clone();
        let request = ApiRequest::put(path).authenticated().json(changes)?;
        let transport = self.ctx.transport.clone();
        let updated = self
            .ctx
            .cache
            .mutate(
                &QueryKey::current_user(),
                async move { transport.send_json::<UserProfile>(request).await },
                MutateOptions::new().invalidate(InvalidatePolicy::Never),
            )
            .await?;

        // The response is the authoritative profile
        self.ctx
            .cache
            .set_data(&QueryKey::current_user(), serde_json::to_value(&updated)?);
        Ok(updated)
    }
}
