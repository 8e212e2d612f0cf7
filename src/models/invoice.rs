use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票表头 (invoices)
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub chave_acesso: String,   // 访问键, 44 位
    pub modelo: Option<String>,
    pub serie: Option<String>,
    pub numero: Option<String>,
    pub natureza_operacao: Option<String>,
    pub data_emissao: Option<NaiveDate>,      // 可变字段
    pub evento_recente: Option<String>,
    pub data_evento: Option<NaiveDateTime>,
    pub cnpj_emitente: Option<String>,
    pub razao_social_emitente: Option<String>,
    pub ie_emitente: Option<String>,
    pub uf_emitente: Option<String>,
    pub municipio_emitente: Option<String>,
    pub cnpj_destinatario: Option<String>,
    pub nome_destinatario: Option<String>,
    pub uf_destinatario: Option<String>,
    pub indicador_ie_destinatario: Option<String>,
    pub destino_operacao: Option<String>,
    pub consumidor_final: Option<String>,
    pub presenca_comprador: Option<String>,
    pub valor_nota_fiscal: Option<BigDecimal>, // 可变字段
}

impl Invoice {
    /// 同一访问键再次出现: 只接收可变字段
    pub fn absorb_mutable(&mut self, later: Invoice) {
        self.valor_nota_fiscal = later.valor_nota_fiscal;
        self.data_emissao = later.data_emissao;
    }
}

/// 发票明细 (invoice_items)
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub chave_acesso: String,
    pub numero_produto: Option<String>,
    pub descricao_produto: Option<String>,
    pub codigo_ncm: Option<String>,
    pub ncm_tipo_produto: Option<String>,
    pub cfop: Option<String>,
    pub quantidade: Option<BigDecimal>,
    pub unidade: Option<String>,
    pub valor_unitario: Option<BigDecimal>,
    pub valor_total: Option<BigDecimal>,
}
