//! # Operator Session
//!
//! Every command runs on behalf of a logged-in operator. The session is
//! created once per invocation from `--user`/`--password` and checked
//! against the module the command belongs to.
//!
//! ```text
//! pdv --user maria cash open 100,00
//!        │
//!        ▼
//! Session::login ──► users.authenticate (argon2, active user, active employee)
//!        │
//!        ▼
//! session.require(Module::CashRegister) ──► denied? exit 6
//!        │
//!        ▼
//! commands::cash::open
//! ```

use tracing::{info, warn};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::state::AppState;
use pdv_core::{CoreError, Module};
use pdv_db::AuthenticatedUser;

#[derive(Debug, Clone)]
pub struct Session {
    operator: AuthenticatedUser,
}

impl Session {
    pub async fn login(state: &AppState, username: &str, password: &str) -> AppResult<Session> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::unauthorized(
                "Informe usuário e senha (--user/--password ou PDV_USER/PDV_PASSWORD)",
            ));
        }
        let operator = state.db().users().authenticate(username.trim(), password).await?;
        Ok(Session { operator })
    }

    pub fn from_authenticated(operator: AuthenticatedUser) -> Self {
        Session { operator }
    }

    pub fn operator(&self) -> &AuthenticatedUser {
        &self.operator
    }

    pub fn user_id(&self) -> &str {
        &self.operator.user.id
    }

    pub fn display_name(&self) -> &str {
        self.operator.display_name()
    }

    pub fn is_admin(&self) -> bool {
        self.operator.permissions.is_admin
    }

    pub fn allows(&self, module: Module) -> bool {
        self.operator.permissions.allows(module)
    }

    /// Fails with `PermissionDenied` unless the operator holds `module`.
    pub fn require(&self, module: Module) -> AppResult<()> {
        if self.allows(module) {
            return Ok(());
        }
        warn!(
            username = %self.operator.user.username,
            module = %module,
            "Access denied"
        );
        Err(CoreError::PermissionDenied(module.to_string()).into())
    }

    /// Administrator-only operations (user management).
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::new(
                ErrorCode::PermissionDenied,
                "Operação restrita a administradores",
            ))
        }
    }

    /// The e-commerce area needs the module and the store-wide switch.
    pub async fn require_ecommerce(&self, state: &AppState) -> AppResult<String> {
        self.require(Module::Ecommerce)?;
        let access = state.db().settings().ecommerce_access().await?;
        if !access.enabled {
            return Err(AppError::business("E-commerce não está habilitado para esta loja"));
        }
        let url = access
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::business("Endereço do e-commerce não configurado"))?;
        info!(username = %self.operator.user.username, "E-commerce access granted");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use pdv_core::EcommerceAccess;

    #[tokio::test]
    async fn test_login_and_admin_access() {
        let state = testing::state().await;
        let session = Session::login(&state, testing::ADMIN, testing::PASSWORD).await.unwrap();
        assert!(session.is_admin());
        assert!(session.require(Module::Payables).is_ok());
        assert!(session.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let state = testing::state().await;

        let err = Session::login(&state, testing::ADMIN, "errada").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let err = Session::login(&state, "", "").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_module_permissions() {
        let state = testing::state().await;
        let session = testing::operator(&state, &[Module::Sales]).await;

        assert!(session.require(Module::Sales).is_ok());
        let err = session.require(Module::CashRegister).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(session.require_admin().unwrap_err().code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_ecommerce_gate() {
        let state = testing::state().await;
        let session = testing::admin(&state).await;

        let err = session.require_ecommerce(&state).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        state
            .db()
            .settings()
            .set_ecommerce(&EcommerceAccess {
                enabled: true,
                url: Some("https://loja.exemplo.com.br".into()),
            })
            .await
            .unwrap();
        assert_eq!(
            session.require_ecommerce(&state).await.unwrap(),
            "https://loja.exemplo.com.br"
        );

        let clerk = testing::operator(&state, &[Module::Sales]).await;
        assert_eq!(
            clerk.require_ecommerce(&state).await.unwrap_err().code,
            ErrorCode::PermissionDenied
        );
    }
}
