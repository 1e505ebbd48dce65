//! Employee commands.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::clean;
use crate::cli::{EmployeeArgs, EmployeeCommand};
use crate::error::{AppError, AppResult};
use crate::output::{date, yes_no, Align, Table};
use crate::state::AppState;
use pdv_core::validation::format_document;
use pdv_core::{Employee, Money};

pub async fn run(state: &AppState, cmd: EmployeeCommand) -> AppResult<String> {
    let employees = state.db().employees();
    match cmd {
        EmployeeCommand::List { all } => {
            let list = employees.list(!all).await?;
            if list.is_empty() {
                return Ok("Nenhum funcionário cadastrado.".into());
            }
            let mut table = Table::new(&[
                ("Nome", Align::Left),
                ("Cargo", Align::Left),
                ("CPF", Align::Left),
                ("Admissão", Align::Left),
                ("Salário", Align::Right),
                ("Ativo", Align::Left),
                ("Id", Align::Left),
            ]);
            for e in &list {
                table.row([
                    e.name.clone(),
                    e.role.clone(),
                    e.cpf.as_deref().map(format_document).unwrap_or_else(|| "-".into()),
                    e.hired_on.map(date).unwrap_or_else(|| "-".into()),
                    Money::from_cents(e.salary_cents).to_string(),
                    yes_no(e.is_active).to_string(),
                    e.id.clone(),
                ]);
            }
            Ok(table.render())
        }
        EmployeeCommand::Add(args) => {
            let employee = employees.insert(&new_employee(args)).await?;
            info!(id = %employee.id, "Employee registered");
            Ok(format!(
                "Funcionário {} cadastrado (id {}).",
                employee.name, employee.id
            ))
        }
        EmployeeCommand::Update {
            id,
            name,
            role,
            phone,
            email,
            salary,
        } => {
            let mut employee = find(state, &id).await?;
            if let Some(name) = name {
                employee.name = name;
            }
            if let Some(role) = role {
                employee.role = role;
            }
            if let Some(phone) = phone {
                employee.phone = clean(Some(phone));
            }
            if let Some(email) = email {
                employee.email = clean(Some(email));
            }
            if let Some(salary) = salary {
                employee.salary_cents = salary.cents();
            }
            employee.updated_at = Utc::now();
            let employee = employees.update(&employee).await?;
            Ok(format!("Funcionário {} atualizado.", employee.name))
        }
        EmployeeCommand::Activate { id } => {
            let employee = find(state, &id).await?;
            employees.set_active(&employee.id, true).await?;
            Ok(format!("Funcionário {} ativado.", employee.name))
        }
        EmployeeCommand::Deactivate { id } => {
            let employee = find(state, &id).await?;
            employees.set_active(&employee.id, false).await?;
            Ok(format!("Funcionário {} desativado.", employee.name))
        }
    }
}

/// By id, or by CPF when the key has 11 digits.
async fn find(state: &AppState, key: &str) -> AppResult<Employee> {
    let employees = state.db().employees();
    if let Some(e) = employees.get_by_id(key.trim()).await? {
        return Ok(e);
    }
    if pdv_core::validation::only_digits(key).len() == 11 {
        if let Some(e) = employees.get_by_cpf(key).await? {
            return Ok(e);
        }
    }
    Err(AppError::not_found("Funcionário", key))
}

fn new_employee(args: EmployeeArgs) -> Employee {
    let now = Utc::now();
    Employee {
        id: Uuid::new_v4().to_string(),
        name: args.name,
        cpf: args.cpf,
        role: args.role,
        phone: args.phone,
        email: args.email,
        hired_on: args.hired_on,
        salary_cents: args.salary.map(|m| m.cents()).unwrap_or(0),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
