use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};

/// PDF 头可出现在文件前 1024 字节内
const HEADER_SEARCH_WINDOW: usize = 1024;

/// 文本提取能力
///
/// 实现为同步调用；调用方负责放到阻塞线程池上执行。
pub trait TextExtractor: Send + Sync {
    /// 按页提取文本，单页失败返回空字符串
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>>;

    /// 所有页文本直接拼接，不加分页符
    fn extract_text(&self, bytes: &[u8]) -> ExtractResult<String> {
        Ok(self.extract_pages(bytes)?.concat())
    }
}

/// 基于 lopdf 的 PDF 文本提取
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn has_pdf_header(bytes: &[u8]) -> bool {
        let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
        window.windows(5).any(|w| w == b"%PDF-")
    }
}

impl TextExtractor for PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> ExtractResult<Vec<String>> {
        if !Self::has_pdf_header(bytes) {
            return Err(ExtractError::UnsupportedType);
        }

        let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Parse(e.to_string()))?;
        let pages = doc.get_pages();
        debug!("Extracting text from {} page(s)", pages.len());

        let texts = pages
            .keys()
            .map(|&page_number| match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Page {} text extraction failed: {}", page_number, e);
                    String::new()
                }
            })
            .collect();

        Ok(texts)
    }
}
