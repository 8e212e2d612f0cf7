use crate::analysis::{profile_tables, records_table};
use crate::error::{PersistenceError, PersistenceResult};
use crate::models::{
    DataContext, DatabaseStatus, InvoiceFilter, InvoiceListing, InvoiceSummary, InvoiceTotals,
    ItemTotals, ProductRanking,
};
use crate::normalize::ClassificationRules;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// AI 上下文中携带的商品数量
const CONTEXT_PRODUCTS: i64 = 50;

/// 汇总统计: 发票一条查询, 明细一条查询
pub async fn invoice_summary(pool: &PgPool) -> PersistenceResult<InvoiceSummary> {
    let invoices = sqlx::query_as::<_, InvoiceTotals>(
        r#"
        SELECT COUNT(*) as total_invoices,
               SUM(valor_nota_fiscal) as total_value,
               AVG(valor_nota_fiscal) as avg_value,
               MIN(data_emissao) as min_date,
               MAX(data_emissao) as max_date,
               COUNT(DISTINCT cnpj_emitente) as unique_emitters,
               COUNT(DISTINCT cnpj_destinatario) as unique_recipients
        FROM invoices
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(PersistenceError::database("summarizing invoices"))?;

    let items = sqlx::query_as::<_, ItemTotals>(
        r#"
        SELECT COUNT(*) as total_items,
               SUM(quantidade) as total_quantity,
               SUM(valor_total) as total_items_value
        FROM invoice_items
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(PersistenceError::database("summarizing invoice items"))?;

    Ok(InvoiceSummary { invoices, items })
}

/// 商品排行 (按总金额降序)
pub async fn top_products(pool: &PgPool, limit: i64) -> PersistenceResult<Vec<ProductRanking>> {
    sqlx::query_as::<_, ProductRanking>(
        r#"
        SELECT descricao_produto,
               SUM(quantidade) as total_quantity,
               SUM(valor_total) as total_value,
               COUNT(*) as frequency
        FROM invoice_items
        WHERE descricao_produto IS NOT NULL
        GROUP BY descricao_produto
        ORDER BY total_value DESC NULLS LAST
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(PersistenceError::database("ranking products"))
}

/// 发票列表 (含明细数量与明细合计), 按开票日期降序
pub async fn query_invoices(pool: &PgPool, filter: &InvoiceFilter) -> PersistenceResult<Vec<InvoiceListing>> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"
        SELECT i.id, i.chave_acesso, i.modelo, i.serie, i.numero, i.natureza_operacao,
               i.data_emissao, i.evento_recente, i.data_evento,
               i.cnpj_emitente, i.razao_social_emitente, i.ie_emitente, i.uf_emitente, i.municipio_emitente,
               i.cnpj_destinatario, i.nome_destinatario, i.uf_destinatario, i.indicador_ie_destinatario,
               i.destino_operacao, i.consumidor_final, i.presenca_comprador, i.valor_nota_fiscal,
               i.created_at,
               COUNT(ii.id) as item_count,
               SUM(ii.valor_total) as calculated_total
        FROM invoices i
        LEFT JOIN invoice_items ii ON i.chave_acesso = ii.chave_acesso
        WHERE 1=1
        "#,
    );

    if let Some(start) = filter.start_date {
        query_builder.push(" AND i.data_emissao >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query_builder.push(" AND i.data_emissao <= ").push_bind(end);
    }
    if let Some(emitente) = &filter.emitente {
        query_builder.push(" AND i.cnpj_emitente = ").push_bind(emitente.clone());
    }
    query_builder.push(" GROUP BY i.id ORDER BY i.data_emissao DESC NULLS LAST, i.id");

    query_builder
        .build_query_as::<InvoiceListing>()
        .fetch_all(pool)
        .await
        .map_err(PersistenceError::database("listing invoices"))
}

/// 检查表是否存在以及是否有数据; 数据库错误折叠为 Error 状态
pub async fn database_status(pool: &PgPool) -> DatabaseStatus {
    let tables: Result<i64, sqlx::Error> = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND table_name IN ('invoices', 'invoice_items')
        "#,
    )
    .fetch_one(pool)
    .await;

    match tables {
        Ok(2) => {}
        Ok(_) => return DatabaseStatus::NoTables,
        Err(e) => return DatabaseStatus::Error { message: e.to_string() },
    }

    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
        .fetch_one(pool)
        .await
    {
        Ok(0) => DatabaseStatus::Empty,
        Ok(invoice_count) => DatabaseStatus::Ready { invoice_count },
        Err(e) => DatabaseStatus::Error { message: e.to_string() },
    }
}

/// 提供给问答组件的上下文: 全部发票 + 前 50 商品, 附两张表的画像
pub async fn data_context(
    pool: &PgPool,
    rules: &ClassificationRules,
) -> PersistenceResult<DataContext> {
    let invoices = query_invoices(pool, &InvoiceFilter::default()).await?;
    let products = top_products(pool, CONTEXT_PRODUCTS).await?;

    let tables = vec![
        ("invoices".to_string(), records_table(&invoices)),
        ("top_products".to_string(), records_table(&products)),
    ];
    let profiles = profile_tables(&tables, rules);

    Ok(DataContext {
        invoices,
        products,
        profiles,
    })
}
