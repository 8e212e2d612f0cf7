//! 写入: 表头 upsert, 明细先删后插, 一次导入一个事务

use crate::error::{PersistenceError, PersistenceResult};
use crate::models::{Invoice, InvoiceItem};
use crate::normalize::NormalizedBatch;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, QueryBuilder};
use std::time::Instant;

/// 每条 INSERT 语句的最大行数
const CHUNK_ROWS: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub invoices_upserted: u64,
    pub items_deleted: u64,
    pub items_inserted: u64,
}

/// 合并批内重复的访问键: 保留首行的不可变字段, 可变字段取最后一行
pub fn fold_invoices(invoices: &[Invoice]) -> Vec<Invoice> {
    let mut folded: IndexMap<&str, Invoice> = IndexMap::with_capacity(invoices.len());
    for invoice in invoices {
        match folded.get_mut(invoice.chave_acesso.as_str()) {
            Some(existing) => existing.absorb_mutable(invoice.clone()),
            None => {
                folded.insert(invoice.chave_acesso.as_str(), invoice.clone());
            }
        }
    }
    folded.into_values().collect()
}

/// 发票表头 upsert; 冲突时只更新 valor_nota_fiscal 和 data_emissao
pub async fn upsert_invoices(conn: &mut PgConnection, invoices: &[Invoice]) -> PersistenceResult<u64> {
    let invoices = fold_invoices(invoices);
    let mut affected = 0;

    for chunk in invoices.chunks(CHUNK_ROWS) {
        let mut query_builder = QueryBuilder::new(
            "INSERT INTO invoices (
                chave_acesso, modelo, serie, numero, natureza_operacao,
                data_emissao, evento_recente, data_evento,
                cnpj_emitente, razao_social_emitente, ie_emitente, uf_emitente, municipio_emitente,
                cnpj_destinatario, nome_destinatario, uf_destinatario, indicador_ie_destinatario,
                destino_operacao, consumidor_final, presenca_comprador, valor_nota_fiscal
            ) ",
        );
        query_builder.push_values(chunk, |mut b, inv| {
            b.push_bind(&inv.chave_acesso)
                .push_bind(&inv.modelo)
                .push_bind(&inv.serie)
                .push_bind(&inv.numero)
                .push_bind(&inv.natureza_operacao)
                .push_bind(inv.data_emissao)
                .push_bind(&inv.evento_recente)
                .push_bind(inv.data_evento)
                .push_bind(&inv.cnpj_emitente)
                .push_bind(&inv.razao_social_emitente)
                .push_bind(&inv.ie_emitente)
                .push_bind(&inv.uf_emitente)
                .push_bind(&inv.municipio_emitente)
                .push_bind(&inv.cnpj_destinatario)
                .push_bind(&inv.nome_destinatario)
                .push_bind(&inv.uf_destinatario)
                .push_bind(&inv.indicador_ie_destinatario)
                .push_bind(&inv.destino_operacao)
                .push_bind(&inv.consumidor_final)
                .push_bind(&inv.presenca_comprador)
                .push_bind(inv.valor_nota_fiscal.clone());
        });
        query_builder.push(
            " ON CONFLICT (chave_acesso) DO UPDATE SET
                valor_nota_fiscal = EXCLUDED.valor_nota_fiscal,
                data_emissao = EXCLUDED.data_emissao",
        );

        let start = Instant::now();
        let result = query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(PersistenceError::database("upserting invoices"))?;
        tracing::debug!("upsert {} invoices, 耗时: {:?}", chunk.len(), start.elapsed());
        affected += result.rows_affected();
    }

    Ok(affected)
}

/// 明细整体替换: 删除批内出现的所有访问键的旧明细, 再插入新明细
///
/// 返回 (删除行数, 插入行数)
pub async fn replace_items(conn: &mut PgConnection, items: &[InvoiceItem]) -> PersistenceResult<(u64, u64)> {
    if items.is_empty() {
        return Ok((0, 0));
    }

    let keys: Vec<String> = items
        .iter()
        .map(|i| i.chave_acesso.clone())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect();

    let deleted = sqlx::query("DELETE FROM invoice_items WHERE chave_acesso = ANY($1)")
        .bind(&keys)
        .execute(&mut *conn)
        .await
        .map_err(PersistenceError::database("deleting invoice items"))?
        .rows_affected();

    let mut inserted = 0;
    for chunk in items.chunks(CHUNK_ROWS) {
        let mut query_builder = QueryBuilder::new(
            "INSERT INTO invoice_items (
                chave_acesso, numero_produto, descricao_produto, codigo_ncm, ncm_tipo_produto,
                cfop, quantidade, unidade, valor_unitario, valor_total
            ) ",
        );
        query_builder.push_values(chunk, |mut b, item| {
            b.push_bind(&item.chave_acesso)
                .push_bind(&item.numero_produto)
                .push_bind(&item.descricao_produto)
                .push_bind(&item.codigo_ncm)
                .push_bind(&item.ncm_tipo_produto)
                .push_bind(&item.cfop)
                .push_bind(item.quantidade.clone())
                .push_bind(&item.unidade)
                .push_bind(item.valor_unitario.clone())
                .push_bind(item.valor_total.clone());
        });

        inserted += query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(PersistenceError::database("inserting invoice items"))?
            .rows_affected();
    }

    tracing::debug!("{} 个访问键: 删除 {} 条明细, 插入 {} 条", keys.len(), deleted, inserted);
    Ok((deleted, inserted))
}

/// 写入一次导入的全部批次
///
/// 先写所有表头批次, 再按压缩包顺序写明细批次; 任一失败整体回滚.
pub async fn merge(pool: &PgPool, batches: &[NormalizedBatch]) -> PersistenceResult<MergeOutcome> {
    let mut outcome = MergeOutcome::default();
    let mut tx = pool
        .begin()
        .await
        .map_err(PersistenceError::database("opening transaction"))?;

    for batch in batches {
        if let NormalizedBatch::Invoices(n) = batch {
            outcome.invoices_upserted += upsert_invoices(&mut tx, &n.records).await?;
        }
    }
    for batch in batches {
        if let NormalizedBatch::Items(n) = batch {
            let (deleted, inserted) = replace_items(&mut tx, &n.records).await?;
            outcome.items_deleted += deleted;
            outcome.items_inserted += inserted;
        }
    }

    // 延迟外键在此检查, 明细引用不存在的发票会在提交时失败
    tx.commit()
        .await
        .map_err(PersistenceError::database("committing ingestion"))?;

    tracing::info!(
        "Merged {} invoices, replaced {} items with {}",
        outcome.invoices_upserted,
        outcome.items_deleted,
        outcome.items_inserted
    );
    Ok(outcome)
}
