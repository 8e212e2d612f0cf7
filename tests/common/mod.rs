#![allow(dead_code)]

use nfe_ingest_rust::db::pool::connect_options;
use sqlx::PgPool;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const KEY_A: &str = "35240112345678000199550010000000011000000011";
pub const KEY_B: &str = "35240112345678000199550010000000021000000022";
pub const KEY_C: &str = "35240212345678000199550010000000031000000033";
pub const KEY_D: &str = "35240112345678000199550010000000051000000055";
pub const KEY_E: &str = "35240112345678000199550010000000061000000066";
pub const UNKNOWN_KEY: &str = "35240312345678000199550010000000041000000044";

pub const HEADER_COLUMNS: &str =
    "CHAVE DE ACESSO;MODELO;SÉRIE;NÚMERO;DATA EMISSÃO;CPF/CNPJ Emitente;RAZÃO SOCIAL EMITENTE;CNPJ DESTINATÁRIO;VALOR NOTA FISCAL";
pub const ITEM_COLUMNS: &str =
    "CHAVE DE ACESSO;NÚMERO PRODUTO;DESCRIÇÃO DO PRODUTO/SERVIÇO;CFOP;QUANTIDADE;UNIDADE;VALOR UNITÁRIO;VALOR TOTAL";

pub fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// 表头: A (2024-01-10, 100,00), B (2024-01-20, 80,00)
pub fn header_csv() -> String {
    format!(
        "{HEADER_COLUMNS}\n\
         {KEY_A};55;1;101;10/01/2024;12345678000199;Comércio São João;98765432000100;100,00\n\
         {KEY_B};55;1;102;20/01/2024;12345678000199;Comércio São João;11222333000144;80,00\n"
    )
}

/// 明细: A 两行 (Widget 100,00 / Gadget 30,00), B 一行 (Widget 50,00)
pub fn items_csv() -> String {
    format!(
        "{ITEM_COLUMNS}\n\
         {KEY_A};1;Widget;5102;2,0000;UN;50,0000;100,00\n\
         {KEY_A};2;Gadget;5102;1,0000;UN;30,0000;30,00\n\
         {KEY_B};1;Widget;5102;1,0000;UN;50,0000;50,00\n"
    )
}

pub fn sample_archive() -> Vec<u8> {
    zip_archive(&[
        ("202401_NFe_NotaFiscal_Cabecalho.csv", &header_csv()),
        ("202401_NFe_NotaFiscal_Itens.csv", &items_csv()),
    ])
}

/// 每个测试使用独立 schema; 未设置 TEST_DATABASE_URL 时返回 None
pub struct TestDb {
    pub pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDb {
    pub async fn connect(name: &str) -> Option<TestDb> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping {name}");
            return None;
        };
        nfe_ingest_rust::logging::init_test();

        let schema = format!("nfe_test_{}_{}", name, std::process::id());
        let admin = PgPool::connect(&url).await.unwrap();
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
            .execute(&admin)
            .await
            .unwrap();
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .unwrap();

        let options = connect_options(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = nfe_ingest_rust::db::pool::create_pool_with(options, 2)
            .await
            .unwrap();

        Some(TestDb { pool, admin, schema })
    }

    pub async fn cleanup(self) {
        self.pool.close().await;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .unwrap();
    }
}
