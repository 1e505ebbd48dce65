//! Configured receipt printers.
//!
//! The transport is stored flattened as `transport` / `target` / `port`
//! columns and rebuilt into [`PrinterTransportKind`] on read.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use pdv_core::validation::validate_name;
use pdv_core::{PrinterConfig, PrinterTransportKind, ValidationError, DEFAULT_PRINTER_PORT};

const COLUMNS: &str = "name, transport, target, port, columns, cut_paper, open_drawer, is_default";

#[derive(sqlx::FromRow)]
struct PrinterRow {
    name: String,
    transport: String,
    target: String,
    port: Option<i64>,
    columns: i64,
    cut_paper: bool,
    open_drawer: bool,
    is_default: bool,
}

impl TryFrom<PrinterRow> for PrinterConfig {
    type Error = DbError;

    fn try_from(row: PrinterRow) -> Result<Self, Self::Error> {
        let transport = match row.transport.as_str() {
            "network" => PrinterTransportKind::Network {
                host: row.target,
                port: row
                    .port
                    .and_then(|p| u16::try_from(p).ok())
                    .unwrap_or(DEFAULT_PRINTER_PORT),
            },
            "device" => PrinterTransportKind::Device { path: row.target },
            "file" => PrinterTransportKind::File { path: row.target },
            other => {
                return Err(DbError::Corrupt(format!(
                    "impressora {}: transporte desconhecido '{}'",
                    row.name, other
                )))
            }
        };

        Ok(PrinterConfig {
            name: row.name,
            transport,
            columns: u16::try_from(row.columns).unwrap_or(48),
            cut_paper: row.cut_paper,
            open_drawer: row.open_drawer,
            is_default: row.is_default,
        })
    }
}

fn split_transport(t: &PrinterTransportKind) -> (&'static str, &str, Option<i64>) {
    match t {
        PrinterTransportKind::Network { host, port } => ("network", host, Some(*port as i64)),
        PrinterTransportKind::Device { path } => ("device", path, None),
        PrinterTransportKind::File { path } => ("file", path, None),
    }
}

#[derive(Debug, Clone)]
pub struct PrinterRepository {
    pool: SqlitePool,
}

impl PrinterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PrinterRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<PrinterConfig>> {
        let sql = format!("SELECT {COLUMNS} FROM printers ORDER BY is_default DESC, name");
        sqlx::query_as::<_, PrinterRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(PrinterConfig::try_from)
            .collect()
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<PrinterConfig>> {
        let sql = format!("SELECT {COLUMNS} FROM printers WHERE name = ?1");
        sqlx::query_as::<_, PrinterRow>(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?
            .map(PrinterConfig::try_from)
            .transpose()
    }

    pub async fn default(&self) -> DbResult<Option<PrinterConfig>> {
        let sql = format!("SELECT {COLUMNS} FROM printers WHERE is_default = 1 LIMIT 1");
        sqlx::query_as::<_, PrinterRow>(&sql)
            .fetch_optional(&self.pool)
            .await?
            .map(PrinterConfig::try_from)
            .transpose()
    }

    /// Adds or replaces a printer by name. Marking it default clears the
    /// flag on every other printer.
    pub async fn upsert(&self, printer: &PrinterConfig) -> DbResult<()> {
        validate_name("nome da impressora", &printer.name, 60)?;
        if !(24..=64).contains(&printer.columns) {
            return Err(ValidationError::OutOfRange {
                field: "colunas".to_string(),
                min: 24,
                max: 64,
            }
            .into());
        }

        let (transport, target, port) = split_transport(&printer.transport);
        let name = printer.name.trim();

        let mut tx = self.pool.begin().await?;
        if printer.is_default {
            sqlx::query("UPDATE printers SET is_default = 0 WHERE name <> ?1")
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!(
            "INSERT INTO printers ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(name) DO UPDATE SET \
                transport = excluded.transport, target = excluded.target, port = excluded.port, \
                columns = excluded.columns, cut_paper = excluded.cut_paper, \
                open_drawer = excluded.open_drawer, is_default = excluded.is_default"
        );
        sqlx::query(&sql)
            .bind(name)
            .bind(transport)
            .bind(target)
            .bind(port)
            .bind(printer.columns as i64)
            .bind(printer.cut_paper)
            .bind(printer.open_drawer)
            .bind(printer.is_default)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(name = %name, transport = %printer.transport, "Printer saved");
        Ok(())
    }

    pub async fn set_default(&self, name: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE printers SET is_default = (name = ?1)")
            .bind(name.trim())
            .execute(&mut *tx)
            .await?;
        let exists: Option<String> = sqlx::query_scalar("SELECT name FROM printers WHERE name = ?1")
            .bind(name.trim())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() || result.rows_affected() == 0 {
            return Err(DbError::not_found("Impressora", name));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM printers WHERE name = ?1")
            .bind(name.trim())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Impressora", name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing;

    #[tokio::test]
    async fn test_transport_round_trip() {
        let db = testing::db().await;
        let mut caixa = PrinterConfig::new(
            "caixa",
            PrinterTransportKind::Network {
                host: "192.168.0.50".to_string(),
                port: 9100,
            },
        );
        caixa.is_default = true;
        db.printers().upsert(&caixa).await.unwrap();

        let mut cozinha =
            PrinterConfig::new("cozinha", "device:/dev/usb/lp0".parse().unwrap());
        cozinha.columns = 32;
        db.printers().upsert(&cozinha).await.unwrap();

        assert_eq!(db.printers().get_by_name("caixa").await.unwrap(), Some(caixa));
        assert_eq!(
            db.printers().get_by_name("cozinha").await.unwrap().unwrap().columns,
            32
        );
        assert_eq!(db.printers().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_single_default() {
        let db = testing::db().await;
        let mut a = PrinterConfig::new("a", "file:/tmp/a.prn".parse().unwrap());
        a.is_default = true;
        db.printers().upsert(&a).await.unwrap();
        let mut b = PrinterConfig::new("b", "file:/tmp/b.prn".parse().unwrap());
        b.is_default = true;
        db.printers().upsert(&b).await.unwrap();

        assert_eq!(db.printers().default().await.unwrap().unwrap().name, "b");

        db.printers().set_default("a").await.unwrap();
        assert_eq!(db.printers().default().await.unwrap().unwrap().name, "a");
        assert!(matches!(
            db.printers().set_default("zzz").await,
            Err(DbError::NotFound { .. })
        ));

        db.printers().delete("a").await.unwrap();
        assert!(db.printers().default().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_columns_validated() {
        let db = testing::db().await;
        let mut p = PrinterConfig::new("x", "file:/tmp/x".parse().unwrap());
        p.columns = 200;
        assert!(db.printers().upsert(&p).await.is_err());
    }
}
