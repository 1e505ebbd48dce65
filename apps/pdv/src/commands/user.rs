//! # Login and User Commands
//!
//! Everything except changing one's own password is admin-only.

use tracing::info;

use crate::cli::UserCommand;
use crate::error::{AppError, AppResult};
use crate::output::{datetime, yes_no, Align, Table};
use crate::state::{AppState, Session};
use pdv_core::{Module, User};

pub fn welcome(session: &Session) -> String {
    let modules: Vec<&str> = session
        .operator()
        .permissions
        .effective()
        .iter()
        .map(|m| m.as_str())
        .collect();
    let mut out = format!("Bem-vindo(a), {}.", session.display_name());
    if session.is_admin() {
        out.push_str("\nPerfil: administrador");
    }
    if modules.is_empty() {
        out.push_str("\nNenhum módulo liberado. Procure o administrador.");
    } else {
        out.push_str(&format!("\nMódulos: {}", modules.join(", ")));
    }
    out
}

pub async fn run(state: &AppState, session: &Session, cmd: UserCommand) -> AppResult<String> {
    if !matches!(cmd, UserCommand::Password { .. }) {
        session.require_admin()?;
    }
    let users = state.db().users();

    match cmd {
        UserCommand::List => {
            let list = users.list().await?;
            let mut table = Table::new(&[
                ("Usuário", Align::Left),
                ("Admin", Align::Left),
                ("Ativo", Align::Left),
                ("Módulos", Align::Left),
                ("Último acesso", Align::Left),
            ]);
            for user in list {
                let permissions = users.permissions(&user.id).await?;
                let modules = if permissions.is_admin {
                    "todos".to_string()
                } else {
                    permissions
                        .effective()
                        .iter()
                        .map(Module::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                };
                table.row([
                    user.username.clone(),
                    yes_no(user.is_admin).to_string(),
                    yes_no(user.is_active).to_string(),
                    modules,
                    user.last_login_at.map(datetime).unwrap_or_else(|| "-".into()),
                ]);
            }
            Ok(table.render())
        }
        UserCommand::Add {
            username,
            password,
            employee,
            admin,
        } => {
            if let Some(id) = &employee {
                state
                    .db()
                    .employees()
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Funcionário", id))?;
            }
            let user = users
                .create(&username, &password, employee.as_deref(), admin)
                .await?;
            info!(username = %user.username, by = %session.operator().user.username, "User created");
            Ok(format!("Usuário {} criado.", user.username))
        }
        UserCommand::Grant { username, modules } => {
            let user = find_user(state, &username).await?;
            for module in &modules {
                users.grant(&user.id, *module).await?;
            }
            Ok(format!("{} agora acessa: {}", user.username, join(&modules)))
        }
        UserCommand::Revoke { username, modules } => {
            let user = find_user(state, &username).await?;
            for module in &modules {
                users.revoke(&user.id, *module).await?;
            }
            Ok(format!("{} não acessa mais: {}", user.username, join(&modules)))
        }
        UserCommand::Activate { username } => {
            let user = find_user(state, &username).await?;
            users.set_active(&user.id, true).await?;
            Ok(format!("Usuário {} ativado.", user.username))
        }
        UserCommand::Deactivate { username } => {
            if username == session.operator().user.username {
                return Err(AppError::business("Não é possível desativar o próprio usuário"));
            }
            let user = find_user(state, &username).await?;
            users.set_active(&user.id, false).await?;
            Ok(format!("Usuário {} desativado.", user.username))
        }
        UserCommand::Password {
            username,
            new_password,
        } => {
            if username != session.operator().user.username {
                session.require_admin()?;
            }
            let user = find_user(state, &username).await?;
            users.set_password(&user.id, &new_password).await?;
            Ok(format!("Senha de {} alterada.", user.username))
        }
    }
}

async fn find_user(state: &AppState, username: &str) -> AppResult<User> {
    state
        .db()
        .users()
        .get_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found("Usuário", username))
}

fn join(modules: &[Module]) -> String {
    modules.iter().map(Module::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;

    #[tokio::test]
    async fn test_welcome_lists_modules() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales, Module::CashRegister]).await;
        let text = welcome(&clerk);
        assert!(text.contains("Módulos: sales, cash_register"));
        assert!(!text.contains("administrador"));
    }

    #[tokio::test]
    async fn test_admin_manages_users() {
        let state = testing::state().await;
        let admin = testing::admin(&state).await;

        run(
            &state,
            &admin,
            UserCommand::Add {
                username: "joao".into(),
                password: "segredo".into(),
                employee: None,
                admin: false,
            },
        )
        .await
        .unwrap();
        run(
            &state,
            &admin,
            UserCommand::Grant {
                username: "joao".into(),
                modules: vec![Module::Sales, Module::Products],
            },
        )
        .await
        .unwrap();

        let joao = Session::login(&state, "joao", "segredo").await.unwrap();
        assert!(joao.allows(Module::Products));

        let list = run(&state, &admin, UserCommand::List).await.unwrap();
        assert!(list.contains("joao"));
        assert!(list.contains("products,sales") || list.contains("sales,products"));
    }

    #[tokio::test]
    async fn test_operator_changes_only_own_password() {
        let state = testing::state().await;
        let clerk = testing::operator(&state, &[Module::Sales]).await;

        let err = run(
            &state,
            &clerk,
            UserCommand::Password {
                username: testing::ADMIN.into(),
                new_password: "trocada".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        run(
            &state,
            &clerk,
            UserCommand::Password {
                username: testing::OPERATOR.into(),
                new_password: "nova-senha".into(),
            },
        )
        .await
        .unwrap();
        assert!(Session::login(&state, testing::OPERATOR, "nova-senha").await.is_ok());

        let err = run(&state, &clerk, UserCommand::List).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_cannot_deactivate_self() {
        let state = testing::state().await;
        let admin = testing::admin(&state).await;
        let err = run(
            &state,
            &admin,
            UserCommand::Deactivate {
                username: testing::ADMIN.into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }
}
