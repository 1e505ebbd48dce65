//! Receipt printer management.

use tracing::info;

use crate::cli::PrinterCommand;
use crate::error::AppResult;
use crate::output::{yes_no, Align, Table};
use crate::state::AppState;
use pdv_core::{PrinterConfig, PrinterTransportKind};

pub async fn run(state: &AppState, cmd: PrinterCommand) -> AppResult<String> {
    let printers = state.db().printers();
    match cmd {
        PrinterCommand::List => {
            let list = printers.list().await?;
            if list.is_empty() {
                return Ok("Nenhuma impressora configurada.".into());
            }
            let mut table = Table::new(&[
                ("Nome", Align::Left),
                ("Destino", Align::Left),
                ("Colunas", Align::Right),
                ("Corte", Align::Left),
                ("Gaveta", Align::Left),
                ("Padrão", Align::Left),
            ]);
            for p in &list {
                table.row([
                    p.name.clone(),
                    p.transport.to_string(),
                    p.columns.to_string(),
                    yes_no(p.cut_paper).to_string(),
                    yes_no(p.open_drawer).to_string(),
                    if p.is_default { "*" } else { "" }.to_string(),
                ]);
            }
            Ok(table.render())
        }
        PrinterCommand::Add {
            name,
            target,
            columns,
            no_cut,
            drawer,
            default,
        } => {
            let transport: PrinterTransportKind = target.parse()?;
            let mut config = PrinterConfig::new(name.trim(), transport);
            config.columns = columns;
            config.cut_paper = !no_cut;
            config.open_drawer = drawer;
            printers.upsert(&config).await?;
            if default {
                printers.set_default(&config.name).await?;
            }
            info!(printer = %config.name, transport = %config.transport, "Printer saved");
            Ok(format!("Impressora {} salva ({}).", config.name, config.transport))
        }
        PrinterCommand::Default { name } => {
            printers.set_default(&name).await?;
            Ok(format!("{} agora é a impressora padrão.", name))
        }
        PrinterCommand::Remove { name } => {
            printers.delete(&name).await?;
            Ok(format!("Impressora {} removida.", name))
        }
        PrinterCommand::Test { name } => {
            let printer = state.printer(name.as_deref()).await?;
            printer.test_page().await?;
            Ok(format!("Página de teste enviada para {}.", printer.name()))
        }
        PrinterCommand::Drawer { name } => {
            let printer = state.printer(name.as_deref()).await?;
            printer.open_drawer().await?;
            Ok(format!("Gaveta aberta ({}).", printer.name()))
        }
    }
}
