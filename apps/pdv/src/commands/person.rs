//! # Customer and Supplier Commands
//!
//! Both groups share one registration table; the group decides which kind
//! a new registration gets and which ones a search returns.
//!
//! A `--cep` given without `--street` is completed from ViaCEP. A failed
//! lookup is logged and the registration is saved with what was typed.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{clean, find_person};
use crate::cli::{AddressArgs, PersonArgs, PersonChanges, PersonCommand};
use crate::error::{AppError, AppResult};
use crate::output::{datetime, opt, yes_no, Align, Table};
use crate::state::AppState;
use pdv_core::validation::format_document;
use pdv_core::{Address, Person, PersonKind};
use pdv_lookup::LookupClient;

pub async fn run(state: &AppState, kind: PersonKind, cmd: PersonCommand) -> AppResult<String> {
    let people = state.db().people();
    let noun = noun(kind);
    match cmd {
        PersonCommand::Search { query, limit } => {
            let found = people.search(kind, &query, limit).await?;
            Ok(list(&found, kind))
        }
        PersonCommand::Show { key } => {
            let person = find_of_kind(state, kind, &key).await?;
            let mut out = details(&person);
            if person.kind.is_customer() {
                let balance = state.db().accounts().balance(&person.id).await?;
                out.push_str(&format!("\nSaldo devedor: {}", balance));
            }
            Ok(out)
        }
        PersonCommand::Add(args) => {
            let kind = if args.both { PersonKind::Both } else { kind };
            let address = resolve_address(state, Address::default(), &args.address).await;
            let now = Utc::now();
            let person = Person {
                id: Uuid::new_v4().to_string(),
                kind,
                name: args.name,
                trade_name: args.trade_name,
                document: args.document,
                email: args.email,
                phone: args.phone,
                address,
                credit_limit_cents: args.credit_limit.map(|m| m.cents()).unwrap_or(0),
                notes: args.notes,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            let person = people.insert(&person).await?;
            info!(id = %person.id, kind = ?person.kind, "Person registered");
            Ok(format!("{} {} cadastrado (id {}).", noun, person.name, person.id))
        }
        PersonCommand::Update { key, changes } => {
            let mut person = find_of_kind(state, kind, &key).await?;
            let address = resolve_address(state, person.address.clone(), &changes.address).await;
            apply(&mut person, changes, address);
            let person = people.update(&person).await?;
            Ok(format!("{} {} atualizado.", noun, person.name))
        }
        PersonCommand::Activate { key } => {
            let person = find_of_kind(state, kind, &key).await?;
            people.set_active(&person.id, true).await?;
            Ok(format!("{} {} ativado.", noun, person.name))
        }
        PersonCommand::Deactivate { key } => {
            let person = find_of_kind(state, kind, &key).await?;
            people.set_active(&person.id, false).await?;
            Ok(format!("{} {} desativado.", noun, person.name))
        }
    }
}

fn noun(kind: PersonKind) -> &'static str {
    match kind {
        PersonKind::Supplier => "Fornecedor",
        _ => "Cliente",
    }
}

async fn find_of_kind(state: &AppState, kind: PersonKind, key: &str) -> AppResult<Person> {
    let person = find_person(state, key).await?;
    let matches = match kind {
        PersonKind::Customer => person.kind.is_customer(),
        PersonKind::Supplier => person.kind.is_supplier(),
        PersonKind::Both => true,
    };
    if !matches {
        return Err(AppError::not_found(noun(kind), key));
    }
    Ok(person)
}

/// Merges typed address fields over `current`, completing from ViaCEP
/// when only the CEP was given.
pub(crate) async fn resolve_address(state: &AppState, current: Address, args: &AddressArgs) -> Address {
    let mut address = current;

    if let Some(cep) = clean(args.cep.clone()) {
        if !args.offline && args.street.is_none() {
            match lookup_cep(state, &cep).await {
                Ok(found) => {
                    address = Address {
                        number: address.number.take(),
                        complement: address.complement.take().or(found.complement.clone()),
                        ..found
                    };
                }
                Err(e) => warn!(cep = %cep, error = %e, "CEP lookup failed, keeping typed address"),
            }
        }
        address.cep = Some(cep);
    }

    let fields = [
        (&args.street, &mut address.street),
        (&args.number, &mut address.number),
        (&args.complement, &mut address.complement),
        (&args.district, &mut address.district),
        (&args.city, &mut address.city),
        (&args.state, &mut address.state),
    ];
    for (typed, field) in fields {
        if let Some(value) = typed {
            *field = clean(Some(value.clone()));
        }
    }
    address
}

async fn lookup_cep(state: &AppState, cep: &str) -> AppResult<Address> {
    let client = LookupClient::new(state.config().lookup_config())?;
    Ok(client.address_by_cep(cep).await?)
}

fn apply(person: &mut Person, changes: PersonChanges, address: Address) {
    if let Some(name) = changes.name {
        person.name = name;
    }
    if let Some(document) = changes.document {
        person.document = clean(Some(document));
    }
    if let Some(trade_name) = changes.trade_name {
        person.trade_name = clean(Some(trade_name));
    }
    if let Some(email) = changes.email {
        person.email = clean(Some(email));
    }
    if let Some(phone) = changes.phone {
        person.phone = clean(Some(phone));
    }
    if let Some(limit) = changes.credit_limit {
        person.credit_limit_cents = limit.cents();
    }
    if let Some(notes) = changes.notes {
        person.notes = clean(Some(notes));
    }
    person.address = address;
    person.updated_at = Utc::now();
}

fn list(people: &[Person], kind: PersonKind) -> String {
    if people.is_empty() {
        return format!("Nenhum {} encontrado.", noun(kind).to_lowercase());
    }
    let mut table = Table::new(&[
        ("Nome", Align::Left),
        ("CPF/CNPJ", Align::Left),
        ("Telefone", Align::Left),
        ("Cidade", Align::Left),
        ("Id", Align::Left),
    ]);
    for p in people {
        table.row([
            p.display_name().to_string(),
            p.document.as_deref().map(format_document).unwrap_or_else(|| "-".into()),
            opt(p.phone.as_deref()).to_string(),
            opt(p.address.city.as_deref()).to_string(),
            p.id.clone(),
        ]);
    }
    table.render()
}

fn details(p: &Person) -> String {
    let limit = if p.credit_limit_cents == 0 {
        "sem limite".to_string()
    } else {
        p.credit_limit().to_string()
    };
    [
        format!("Nome:          {}", p.name),
        format!("Fantasia:      {}", opt(p.trade_name.as_deref())),
        format!("Tipo:          {}", p.kind.label()),
        format!(
            "CPF/CNPJ:      {}",
            p.document.as_deref().map(format_document).unwrap_or_else(|| "-".into())
        ),
        format!("E-mail:        {}", opt(p.email.as_deref())),
        format!("Telefone:      {}", opt(p.phone.as_deref())),
        format!("Endereço:      {}", p.address.one_line()),
        format!("Limite fiado:  {}", limit),
        format!("Observações:   {}", opt(p.notes.as_deref())),
        format!("Ativo:         {}", yes_no(p.is_active)),
        format!("Cadastro:      {}", datetime(p.created_at)),
        format!("Id:            {}", p.id),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use pdv_core::Money;

    fn args(name: &str, document: Option<&str>) -> PersonArgs {
        PersonArgs {
            name: name.into(),
            document: document.map(String::from),
            trade_name: None,
            email: None,
            phone: Some("(11) 98765-4321".into()),
            address: AddressArgs {
                cep: Some("01001-000".into()),
                street: Some("Praça da Sé".into()),
                number: Some("100".into()),
                city: Some("São Paulo".into()),
                state: Some("sp".into()),
                offline: true,
                ..Default::default()
            },
            credit_limit: Some(Money::from_cents(50_000)),
            notes: None,
            both: false,
        }
    }

    #[tokio::test]
    async fn test_customer_registration() {
        let state = testing::state().await;
        run(
            &state,
            PersonKind::Customer,
            PersonCommand::Add(args("Maria da Silva", Some("529.982.247-25"))),
        )
        .await
        .unwrap();

        let out = run(
            &state,
            PersonKind::Customer,
            PersonCommand::Show {
                key: "52998224725".into(),
            },
        )
        .await
        .unwrap();
        assert!(out.contains("529.982.247-25"));
        assert!(out.contains("R$ 500,00"));
        assert!(out.contains("SP"));
        assert!(out.contains("Saldo devedor: R$ 0,00"));
    }

    #[tokio::test]
    async fn test_supplier_is_not_a_customer() {
        let state = testing::state().await;
        run(
            &state,
            PersonKind::Supplier,
            PersonCommand::Add(args("Distribuidora Norte", Some("11.222.333/0001-81"))),
        )
        .await
        .unwrap();

        let err = run(
            &state,
            PersonKind::Customer,
            PersonCommand::Show {
                key: "11222333000181".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let found = run(
            &state,
            PersonKind::Supplier,
            PersonCommand::Search {
                query: "norte".into(),
                limit: 10,
            },
        )
        .await
        .unwrap();
        assert!(found.contains("11.222.333/0001-81"));
    }

    #[tokio::test]
    async fn test_invalid_document_is_rejected() {
        let state = testing::state().await;
        let err = run(
            &state,
            PersonKind::Customer,
            PersonCommand::Add(args("José", Some("123.456.789-00"))),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_typed_address_wins_offline() {
        let state = testing::state().await;
        let current = Address {
            street: Some("Rua Velha".into()),
            number: Some("10".into()),
            ..Default::default()
        };
        let address = resolve_address(
            &state,
            current,
            &AddressArgs {
                cep: Some("01001000".into()),
                street: Some("Rua Nova".into()),
                offline: true,
                ..Default::default()
            },
        )
        .await;
        assert_eq!(address.street.as_deref(), Some("Rua Nova"));
        assert_eq!(address.number.as_deref(), Some("10"));
        assert_eq!(address.cep.as_deref(), Some("01001000"));
    }
}
