use crate::error::{PersistenceError, PersistenceResult};
use sqlx::PgPool;

const CREATE_INVOICES: &str = r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id SERIAL PRIMARY KEY,
        chave_acesso VARCHAR(44) UNIQUE NOT NULL,
        modelo TEXT,
        serie VARCHAR(50),
        numero VARCHAR(50),
        natureza_operacao TEXT,
        data_emissao DATE,
        evento_recente TEXT,
        data_evento TIMESTAMP,
        cnpj_emitente VARCHAR(50),
        razao_social_emitente TEXT,
        ie_emitente VARCHAR(50),
        uf_emitente VARCHAR(2),
        municipio_emitente TEXT,
        cnpj_destinatario VARCHAR(50),
        nome_destinatario TEXT,
        uf_destinatario VARCHAR(2),
        indicador_ie_destinatario VARCHAR(50),
        destino_operacao VARCHAR(50),
        consumidor_final VARCHAR(50),
        presenca_comprador VARCHAR(50),
        valor_nota_fiscal DECIMAL(15,2),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

// 外键延迟到提交时检查: 同一事务内表头与明细的写入顺序不受限制
const CREATE_INVOICE_ITEMS: &str = r#"
    CREATE TABLE IF NOT EXISTS invoice_items (
        id SERIAL PRIMARY KEY,
        chave_acesso VARCHAR(44) NOT NULL,
        numero_produto VARCHAR(20),
        descricao_produto TEXT,
        codigo_ncm VARCHAR(20),
        ncm_tipo_produto TEXT,
        cfop VARCHAR(10),
        quantidade DECIMAL(15,4),
        unidade VARCHAR(10),
        valor_unitario DECIMAL(15,4),
        valor_total DECIMAL(15,2),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (chave_acesso) REFERENCES invoices (chave_acesso) DEFERRABLE INITIALLY DEFERRED
    )
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_invoices_data_emissao ON invoices (data_emissao)",
    "CREATE INDEX IF NOT EXISTS idx_invoices_cnpj_emitente ON invoices (cnpj_emitente)",
    "CREATE INDEX IF NOT EXISTS idx_invoice_items_chave_acesso ON invoice_items (chave_acesso)",
];

/// 建表 (幂等)
pub async fn create_tables(pool: &PgPool) -> PersistenceResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(PersistenceError::database("opening schema transaction"))?;

    sqlx::query(CREATE_INVOICES)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::database("creating table invoices"))?;
    sqlx::query(CREATE_INVOICE_ITEMS)
        .execute(&mut *tx)
        .await
        .map_err(PersistenceError::database("creating table invoice_items"))?;
    for ddl in CREATE_INDEXES {
        sqlx::query(ddl)
            .execute(&mut *tx)
            .await
            .map_err(PersistenceError::database("creating indexes"))?;
    }

    tx.commit()
        .await
        .map_err(PersistenceError::database("committing schema"))?;
    tracing::info!("Database schema ready");
    Ok(())
}
