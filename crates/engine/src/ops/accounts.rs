use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    EngineError, MoneyCents, ProfileUpdate, RegisterUserCmd, ResultEngine, User, UserProfile,
    hash_password, user_profiles, users,
    util::{normalize_email, normalize_optional, normalize_required},
    verify_password,
};

use super::{Engine, ProfileOverview, with_tx};

impl Engine {
    /// Sign up a user and open their profile with a zero balance.
    pub async fn register_user(&self, cmd: RegisterUserCmd) -> ResultEngine<User> {
        let username = normalize_required(&cmd.username, "username")?;
        let email = normalize_email(&cmd.email)?;
        if cmd.password.is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }
        let password = hash_password(&cmd.password)?;
        let first_name = normalize_optional(cmd.first_name.as_deref()).unwrap_or_default();
        let last_name = normalize_optional(cmd.last_name.as_deref()).unwrap_or_default();

        let user = with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username));
            }

            let active = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                password: ActiveValue::Set(password),
                email: ActiveValue::Set(email),
                first_name: ActiveValue::Set(first_name),
                last_name: ActiveValue::Set(last_name),
            };
            let model = active.insert(&db_tx).await?;
            self.ensure_profile(&db_tx, &username).await?;
            Ok::<_, EngineError>(User::from(model))
        })?;

        tracing::info!(user = %user.username, "user registered");
        Ok(user)
    }

    /// Check `password` against the stored hash. Unknown users and wrong
    /// passwords both yield `None`.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Option<User>> {
        let Some(model) = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?
        else {
            tracing::debug!(user = %username, "authentication failed: unknown user");
            return Ok(None);
        };
        if !verify_password(password, &model.password) {
            tracing::debug!(user = %username, "authentication failed: wrong password");
            return Ok(None);
        }
        Ok(Some(model.into()))
    }

    /// The user, their balance (the profile is created on first access) and
    /// their ledger, newest first.
    pub async fn profile(&self, username: &str) -> ResultEngine<ProfileOverview> {
        let (user, profile) = with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, username).await?;
            let profile = self.ensure_profile(&db_tx, username).await?;
            Ok::<_, EngineError>((User::from(user), UserProfile::from(profile)))
        })?;
        let history = self.borrowing_history(username).await?;

        Ok(ProfileOverview {
            user,
            profile,
            history,
        })
    }

    /// Change e-mail and names. A blank name clears it; a blank e-mail is
    /// rejected.
    pub async fn update_profile(&self, username: &str, update: ProfileUpdate) -> ResultEngine<User> {
        let email = update.email.as_deref().map(normalize_email).transpose()?;

        let user = with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, username).await?;
            if update.is_empty() {
                return Ok(User::from(model));
            }

            let mut active: users::ActiveModel = model.into();
            if let Some(email) = email {
                active.email = ActiveValue::Set(email);
            }
            if let Some(first_name) = update.first_name.as_deref() {
                active.first_name = ActiveValue::Set(first_name.trim().to_string());
            }
            if let Some(last_name) = update.last_name.as_deref() {
                active.last_name = ActiveValue::Set(last_name.trim().to_string());
            }
            let model = active.update(&db_tx).await?;
            Ok::<_, EngineError>(User::from(model))
        })?;

        tracing::info!(user = %username, "profile updated");
        Ok(user)
    }

    /// Add `amount` (a decimal string such as `"12.50"`) to the balance.
    pub async fn deposit(&self, username: &str, amount: &str) -> ResultEngine<UserProfile> {
        let amount: MoneyCents = amount.parse()?;
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "Deposit amount must be greater than zero.".to_string(),
            ));
        }

        let profile = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await?;
            self.ensure_profile(&db_tx, username).await?;
            let credited = user_profiles::Entity::update_many()
                .col_expr(
                    user_profiles::Column::Balance,
                    Expr::col(user_profiles::Column::Balance).add(amount.cents()),
                )
                .filter(user_profiles::Column::UserId.eq(username))
                .filter(user_profiles::Column::Balance.lte(i64::MAX - amount.cents()))
                .exec(&db_tx)
                .await?;
            if credited.rows_affected == 0 {
                return Err(EngineError::InvalidAmount("amount too large".to_string()));
            }
            let model = self.ensure_profile(&db_tx, username).await?;
            Ok::<_, EngineError>(UserProfile::from(model))
        })?;

        tracing::info!(user = %username, %amount, balance = %profile.balance, "deposit credited");
        Ok(profile)
    }
}
