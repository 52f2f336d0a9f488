// ============================================================================
// Terminal rendering
// ============================================================================
// Pure formatting: every function returns a String so the REPL and the
// one-shot commands print the same thing.
// ============================================================================

use colored::{Color, Colorize};
use recommender_core::conversation::ProductView;
use recommender_core::transactions::{TransactionView, EMPTY_MESSAGE};
use recommender_core::{ConversationTurn, Notice, NoticeLevel, Product, Speaker, Theme, Transaction, TransactionStatus};

/// Colours for one theme
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub accent: Color,
    pub user: Color,
    pub ai: Color,
    pub muted: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: Color::BrightGreen,
                user: Color::BrightCyan,
                ai: Color::BrightBlue,
                muted: Color::BrightBlack,
            },
            Theme::Light => Self {
                accent: Color::Green,
                user: Color::Blue,
                ai: Color::Magenta,
                muted: Color::Black,
            },
        }
    }
}

pub fn heading(title: &str, palette: &Palette) -> String {
    format!("> {}", title).color(palette.accent).bold().to_string()
}

pub fn turn(turn: &ConversationTurn, palette: &Palette) -> String {
    match turn.speaker {
        Speaker::User => format!("$ {}", turn.message).color(palette.user).to_string(),
        Speaker::Ai => format!("[ai]: {}", turn.message).color(palette.ai).to_string(),
    }
}

pub fn thinking(palette: &Palette) -> String {
    "[ai]: thinking... (Ctrl-C to stop waiting)".color(palette.muted).to_string()
}

pub fn notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success => format!("✓ {}", notice.message).green().to_string(),
        NoticeLevel::Info => format!("ℹ {}", notice.message).yellow().to_string(),
        NoticeLevel::Error => format!("✗ {}", notice.message).red().to_string(),
    }
}

pub fn product_card(product: &Product, palette: &Palette) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}  {}\n",
        product.name.bold(),
        product.price.display().color(palette.accent)
    ));
    out.push_str(&format!("  {}\n", product.description));
    for spec in &product.specs {
        out.push_str(&format!("  {}: {}\n", spec.key.color(palette.muted), spec.value));
    }
    out.push_str(&format!(
        "  match {:.0}%  {}\n",
        product.confidence_score * 100.0,
        product.vendor_url.color(palette.muted).underline()
    ));
    out
}

pub fn product_view(view: ProductView<'_>, palette: &Palette) -> String {
    match view {
        ProductView::Nothing => String::new(),
        ProductView::Clarification(question) => {
            format!("{}\n  {}\n", heading("clarification_needed", palette), question)
        }
        ProductView::Empty => format!(
            "{}\n  {}\n",
            heading("recommendations", palette),
            "No products matched that query.".color(palette.muted)
        ),
        ProductView::Products(products) => {
            let mut out = heading("recommendations", palette);
            out.push('\n');
            for product in products {
                out.push_str(&product_card(product, palette));
                out.push('\n');
            }
            out.push_str(&"$ tip_with_mpesa() -> /tip".color(palette.muted).to_string());
            out.push('\n');
            out
        }
    }
}

fn status_label(status: TransactionStatus) -> String {
    match status {
        TransactionStatus::Completed => status.as_str().green().to_string(),
        TransactionStatus::Pending => status.as_str().yellow().to_string(),
        TransactionStatus::Failed => status.as_str().red().to_string(),
    }
}

pub fn transaction_table(rows: &[Transaction]) -> String {
    let mut out = format!(
        "{:<12}  {:<14}  {:>12}  {:<10}  {}\n",
        "TRANSACTION", "PHONE NUMBER", "AMOUNT", "STATUS", "DATE"
    );
    out.push_str(&"-".repeat(78));
    out.push('\n');
    for row in rows {
        // pad before colouring so escape codes don't break alignment
        let status = format!("{:<10}", row.status.as_str());
        out.push_str(&format!(
            "{:<12}  {:<14}  {:>12}  {}  {}\n",
            row.id,
            row.phone_number,
            row.amount_display(),
            status.replace(row.status.as_str(), &status_label(row.status)),
            row.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    out
}

pub fn transaction_view(view: TransactionView<'_>, palette: &Palette) -> String {
    let body = match view {
        TransactionView::Skeleton => {
            let bar = "░".repeat(70).color(palette.muted).to_string();
            vec![bar; 6].join("\n") + "\n"
        }
        TransactionView::Table(rows) => transaction_table(rows),
        TransactionView::Empty => format!(
            "  {}\n  {}\n",
            EMPTY_MESSAGE,
            "Support the tool with M-Pesa to see transactions here.".color(palette.muted)
        ),
        TransactionView::RetryPrompt(message) => {
            format!("  {}\n  {}\n", message, "$ retry()".color(palette.accent))
        }
    };
    format!("{}\n{}", heading("m-pesa_logs", palette), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use recommender_core::{Price, ProductSpec};

    fn plain() -> Palette {
        colored::control::set_override(false);
        Palette::for_theme(Theme::Dark)
    }

    fn laptop() -> Product {
        Product {
            name: "Premium Laptop Pro".into(),
            description: "16GB RAM".into(),
            specs: vec![ProductSpec::new("RAM", "16GB")],
            image_url: String::new(),
            price: Price::kes(129_999.0),
            vendor_url: "https://example.com/product-1".into(),
            confidence_score: 0.94,
        }
    }

    #[test]
    fn test_product_card() {
        let card = product_card(&laptop(), &plain());
        assert!(card.starts_with("Premium Laptop Pro  KSh 129999\n"));
        assert!(card.contains("  RAM: 16GB\n"));
        assert!(card.contains("match 94%"));
    }

    #[test]
    fn test_clarification_view_has_no_empty_message() {
        let palette = plain();
        let out = product_view(ProductView::Clarification("What's your budget?"), &palette);
        assert!(out.contains("What's your budget?"));
        assert!(!out.contains("No products matched"));
        assert_eq!(product_view(ProductView::Nothing, &palette), "");
    }

    #[test]
    fn test_turns() {
        let palette = plain();
        assert_eq!(turn(&ConversationTurn::user("tv"), &palette), "$ tv");
        assert_eq!(turn(&ConversationTurn::ai("hi"), &palette), "[ai]: hi");
    }

    #[test]
    fn test_transaction_table_rows() {
        plain();
        let rows = vec![Transaction {
            id: "TXABCD1234".into(),
            phone_number: "254712345678".into(),
            amount: 100.0,
            status: TransactionStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }];
        let table = transaction_table(&rows);
        let line = table.lines().nth(2).unwrap();
        assert!(line.starts_with("TXABCD1234    254712345678"));
        assert!(line.contains("KSh 100.00"));
        assert!(line.contains("pending"));
        assert!(line.ends_with("2026-01-02 03:04:05 UTC"));
    }

    #[test]
    fn test_failed_view_shows_retry_only() {
        let out = transaction_view(TransactionView::RetryPrompt("Failed to load"), &plain());
        assert!(out.contains("$ retry()"));
        assert!(!out.contains("TRANSACTION"));
        assert!(!out.contains(EMPTY_MESSAGE));
    }
}
