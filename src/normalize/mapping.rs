//! 源文件列名 -> 规范列名

/// 发票表头文件 (NotaFiscal Cabecalho)
pub const INVOICE_COLUMNS: &[(&str, &str)] = &[
    ("CHAVE DE ACESSO", "chave_acesso"),
    ("MODELO", "modelo"),
    ("SÉRIE", "serie"),
    ("NÚMERO", "numero"),
    ("NATUREZA DA OPERAÇÃO", "natureza_operacao"),
    ("DATA EMISSÃO", "data_emissao"),
    ("EVENTO MAIS RECENTE", "evento_recente"),
    ("DATA/HORA EVENTO MAIS RECENTE", "data_evento"),
    ("CPF/CNPJ Emitente", "cnpj_emitente"),
    ("RAZÃO SOCIAL EMITENTE", "razao_social_emitente"),
    ("INSCRIÇÃO ESTADUAL EMITENTE", "ie_emitente"),
    ("UF EMITENTE", "uf_emitente"),
    ("MUNICÍPIO EMITENTE", "municipio_emitente"),
    ("CNPJ DESTINATÁRIO", "cnpj_destinatario"),
    ("NOME DESTINATÁRIO", "nome_destinatario"),
    ("UF DESTINATÁRIO", "uf_destinatario"),
    ("INDICADOR IE DESTINATÁRIO", "indicador_ie_destinatario"),
    ("DESTINO DA OPERAÇÃO", "destino_operacao"),
    ("CONSUMIDOR FINAL", "consumidor_final"),
    ("PRESENÇA DO COMPRADOR", "presenca_comprador"),
    ("VALOR NOTA FISCAL", "valor_nota_fiscal"),
];

/// 发票明细文件 (NotaFiscal Itens)
pub const ITEM_COLUMNS: &[(&str, &str)] = &[
    ("CHAVE DE ACESSO", "chave_acesso"),
    ("NÚMERO PRODUTO", "numero_produto"),
    ("DESCRIÇÃO DO PRODUTO/SERVIÇO", "descricao_produto"),
    ("CÓDIGO NCM/SH", "codigo_ncm"),
    ("NCM/SH (TIPO DE PRODUTO)", "ncm_tipo_produto"),
    ("CFOP", "cfop"),
    ("QUANTIDADE", "quantidade"),
    ("UNIDADE", "unidade"),
    ("VALOR UNITÁRIO", "valor_unitario"),
    ("VALOR TOTAL", "valor_total"),
];

/// 精确匹配源列名
pub fn canonical_name(mapping: &[(&str, &'static str)], source: &str) -> Option<&'static str> {
    mapping
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
}
