//! A configured printer: layout width, paper cut and drawer behavior bound
//! to a transport.

use tracing::{info, warn};

use crate::escpos::{Align, EscPos};
use crate::error::PrintResult;
use crate::receipt::{Receipt, ReceiptLayout};
use crate::transport::PrinterTransport;
use pdv_core::PrinterConfig;

/// Lines fed before cutting so the last text clears the cutter.
const FEED_BEFORE_CUT: u8 = 4;

#[derive(Debug, Clone)]
pub struct Printer {
    name: String,
    transport: PrinterTransport,
    layout: ReceiptLayout,
    cut_paper: bool,
    open_drawer: bool,
}

impl Printer {
    pub fn from_config(config: &PrinterConfig) -> Self {
        Printer {
            name: config.name.clone(),
            transport: PrinterTransport::from_kind(&config.transport),
            layout: ReceiptLayout::new(config.columns as usize),
            cut_paper: config.cut_paper,
            open_drawer: config.open_drawer,
        }
    }

    /// Replaces the transport, e.g. to change network timeouts.
    pub fn with_transport(mut self, transport: PrinterTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> ReceiptLayout {
        self.layout
    }

    /// Prints a receipt. The drawer opens only when enabled for this printer
    /// and the receipt has a cash payment.
    pub async fn print_receipt(&self, receipt: &Receipt) -> PrintResult<()> {
        let mut doc = EscPos::new();
        doc.init();
        self.layout.write_escpos(&mut doc, receipt);
        self.finish(&mut doc);
        if self.open_drawer && receipt.has_cash() && !receipt.cancelled {
            doc.open_drawer();
        }

        self.send(doc.finish(), "receipt").await?;
        info!(printer = %self.name, receipt = %receipt.receipt_number, "Receipt printed");
        Ok(())
    }

    /// Sends bytes untouched.
    pub async fn print_raw(&self, bytes: &[u8]) -> PrintResult<()> {
        self.send(bytes.to_vec(), "raw").await
    }

    /// Prints the printer name, transport, width ruler and an accent sample.
    pub async fn test_page(&self) -> PrintResult<()> {
        let cols = self.layout.columns;
        let ruler: String = (1..=cols)
            .map(|i| char::from(b'0' + (i % 10) as u8))
            .collect();

        let mut doc = EscPos::new();
        doc.init()
            .align(Align::Center)
            .bold(true)
            .double_size(true)
            .line("TESTE")
            .double_size(false)
            .bold(false)
            .line(&self.name)
            .line(&self.transport.target())
            .align(Align::Left)
            .line(&"-".repeat(cols))
            .line(&ruler)
            .line(&format!("{} colunas", cols))
            .line("ÁÉÍÓÚ ÂÊÔ ÃÕ Ç")
            .line("áéíóú âêô ãõ ç º ª")
            .bold(true)
            .line("Negrito")
            .bold(false)
            .underline(true)
            .line("Sublinhado")
            .underline(false);
        self.finish(&mut doc);

        self.send(doc.finish(), "test page").await?;
        info!(printer = %self.name, "Test page printed");
        Ok(())
    }

    /// Kicks the cash drawer connected to the printer.
    pub async fn open_drawer(&self) -> PrintResult<()> {
        let mut doc = EscPos::new();
        doc.init().open_drawer();
        self.send(doc.finish(), "drawer").await
    }

    fn finish(&self, doc: &mut EscPos) {
        doc.feed(FEED_BEFORE_CUT);
        if self.cut_paper {
            doc.cut(true);
        }
    }

    async fn send(&self, bytes: Vec<u8>, what: &str) -> PrintResult<()> {
        self.transport.send(&bytes).await.map_err(|e| {
            warn!(printer = %self.name, job = what, error = %e, "Print failed");
            e
        })
    }
}
