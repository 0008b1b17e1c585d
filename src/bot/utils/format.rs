use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::{
    constants::{
        commands::{
            CALLBACK_DELETE_TRANSACTION, CALLBACK_EXPORT_SESSION, CALLBACK_LIST_PAGE,
            CALLBACK_REOPEN_SESSION, CALLBACK_SELECT_SESSION, CALLBACK_SHOW_EXPORT,
            CALLBACK_SHOW_SETTLEMENT, CALLBACK_SHOW_SPLIT,
        },
        misc::CURRENCY_SYMBOL,
    },
    models::Session,
    optimizer::{PlannedPayment, SettlementSummary},
    processor::TransactionPage,
};

// Groups digits in thousands with dots, e.g. 1500000 -> 1.500.000
pub fn display_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

// Displays an amount together with the currency symbol
pub fn display_currency_amount(amount: i64) -> String {
    format!("{CURRENCY_SYMBOL}{}", display_amount(amount))
}

pub fn display_session_label(session: &Session, focused: bool) -> String {
    let status = if session.is_active() { "🟢" } else { "🔴" };
    let focus = if focused { "⭐️ " } else { "" };
    format!("{focus}{status} {}", session.name)
}

// Displays one page of transactions, numbered across pages.
pub fn display_transaction_page(session_name: &str, page: &TransactionPage) -> String {
    let mut message = format!(
        "📜 Transactions in {} (page {}/{})\n\n",
        session_name, page.page, page.total_pages
    );
    for row in &page.rows {
        message.push_str(&format!(
            "{}. {} paid {} for {} ({})\n",
            row.number,
            row.payer,
            display_currency_amount(row.amount),
            row.consumer,
            row.description
        ));
    }
    message
}

// Displays who paid what. Members who paid nothing are left out.
pub fn display_summary(session_name: &str, summary: &SettlementSummary) -> String {
    let mut payments: Vec<_> = summary
        .payments
        .iter()
        .filter(|payment| payment.total_paid > 0)
        .collect();
    payments.sort_by(|a, b| b.total_paid.cmp(&a.total_paid));

    let mut message = format!(
        "📊 Summary of {}\n\nTotal expenses: {}\n\nWho paid what:\n",
        session_name,
        display_currency_amount(summary.total_expenses)
    );
    for payment in payments {
        message.push_str(&format!(
            "- {}: paid {}\n",
            payment.username,
            display_currency_amount(payment.total_paid)
        ));
    }
    message
}

pub fn display_plan(plan: &[PlannedPayment]) -> String {
    let mut message = "💸 Settlement plan\n\n".to_string();
    for payment in plan {
        message.push_str(&format!(
            "{} pays {} {}\n",
            payment.from,
            payment.to,
            display_currency_amount(payment.amount)
        ));
    }
    message
}

// Make a keyboard, button menu. Each button is a (label, callback data) pair.
pub fn make_keyboard(buttons: Vec<(String, String)>, columns: Option<usize>) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = buttons
        .into_iter()
        .map(|(label, data)| InlineKeyboardButton::callback(label, data))
        .collect();

    let keyboard: Vec<Vec<InlineKeyboardButton>> = match columns {
        Some(col) => buttons.chunks(col).map(|chunk| chunk.to_vec()).collect(),
        None => buttons.into_iter().map(|button| vec![button]).collect(),
    };

    InlineKeyboardMarkup::new(keyboard)
}

pub fn make_keyboard_sessions(sessions: &[Session], focused_id: Option<&str>) -> InlineKeyboardMarkup {
    let buttons = sessions
        .iter()
        .map(|session| {
            let focused = focused_id == Some(session.id.as_str());
            (
                display_session_label(session, focused),
                format!("{CALLBACK_SELECT_SESSION}:{}", session.id),
            )
        })
        .collect();
    make_keyboard(buttons, None)
}

pub fn make_keyboard_ended_session(session_id: &str) -> InlineKeyboardMarkup {
    let buttons = vec![
        (
            "🔄 Reopen".to_string(),
            format!("{CALLBACK_REOPEN_SESSION}:{session_id}"),
        ),
        (
            "📂 View Report".to_string(),
            format!("{CALLBACK_EXPORT_SESSION}:{session_id}"),
        ),
    ];
    make_keyboard(buttons, Some(2))
}

// Delete buttons, one per row, then previous/next on the last row.
pub fn make_keyboard_transactions(page: &TransactionPage) -> InlineKeyboardMarkup {
    let mut keyboard: Vec<Vec<InlineKeyboardButton>> = page
        .rows
        .iter()
        .map(|row| {
            vec![InlineKeyboardButton::callback(
                format!("Delete No. {}", row.number),
                format!(
                    "{CALLBACK_DELETE_TRANSACTION}:{}:{}",
                    row.transaction_id, page.page
                ),
            )]
        })
        .collect();

    let mut pagination = Vec::new();
    if page.page > 1 {
        pagination.push(InlineKeyboardButton::callback(
            "⬅️ Previous",
            format!("{CALLBACK_LIST_PAGE}:{}", page.page - 1),
        ));
    }
    if page.page < page.total_pages {
        pagination.push(InlineKeyboardButton::callback(
            "Next ➡️",
            format!("{CALLBACK_LIST_PAGE}:{}", page.page + 1),
        ));
    }
    if !pagination.is_empty() {
        keyboard.push(pagination);
    }

    InlineKeyboardMarkup::new(keyboard)
}

pub fn make_keyboard_show_split() -> InlineKeyboardMarkup {
    make_keyboard(
        vec![("📊 View Summary".to_string(), CALLBACK_SHOW_SPLIT.to_string())],
        None,
    )
}

pub fn make_keyboard_show_settlement() -> InlineKeyboardMarkup {
    make_keyboard(
        vec![(
            "💸 Who Owes Whom".to_string(),
            CALLBACK_SHOW_SETTLEMENT.to_string(),
        )],
        None,
    )
}

pub fn make_keyboard_show_export() -> InlineKeyboardMarkup {
    make_keyboard(
        vec![("🧾 Export Report".to_string(), CALLBACK_SHOW_EXPORT.to_string())],
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{optimizer::MemberPayment, processor::TransactionRow};

    fn row(number: usize) -> TransactionRow {
        TransactionRow {
            number,
            transaction_id: format!("tx{number}"),
            payer: "rio".to_string(),
            consumer: "Budi".to_string(),
            amount: 24000,
            description: "mie ayam".to_string(),
        }
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(0), "0");
        assert_eq!(display_amount(999), "999");
        assert_eq!(display_amount(1000), "1.000");
        assert_eq!(display_amount(1500000), "1.500.000");
        assert_eq!(display_amount(-24000), "-24.000");
        assert_eq!(display_currency_amount(75000), "Rp75.000");
    }

    #[test]
    fn test_display_summary_sorts_and_hides_non_payers() {
        let summary = SettlementSummary {
            total_expenses: 150000,
            member_count: 3,
            payments: vec![
                MemberPayment {
                    member_id: "a".to_string(),
                    username: "Budi".to_string(),
                    total_paid: 50000,
                },
                MemberPayment {
                    member_id: "b".to_string(),
                    username: "Cindy".to_string(),
                    total_paid: 0,
                },
                MemberPayment {
                    member_id: "c".to_string(),
                    username: "rio".to_string(),
                    total_paid: 100000,
                },
            ],
        };
        let text = display_summary("Trip", &summary);
        assert!(text.contains("Total expenses: Rp150.000"));
        assert!(!text.contains("Cindy"));
        let rio = text.find("- rio").unwrap();
        let budi = text.find("- Budi").unwrap();
        assert!(rio < budi);
    }

    #[test]
    fn test_transactions_keyboard() {
        let page = TransactionPage {
            rows: vec![row(11), row(12)],
            page: 2,
            total_pages: 3,
            total: 25,
        };
        let keyboard = make_keyboard_transactions(&page);
        assert_eq!(keyboard.inline_keyboard.len(), 3);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Delete No. 11");
        assert_eq!(keyboard.inline_keyboard[2].len(), 2);

        let text = display_transaction_page("Trip", &page);
        assert!(text.contains("(page 2/3)"));
        assert!(text.contains("11. rio paid Rp24.000 for Budi (mie ayam)"));
    }

    #[test]
    fn test_session_label() {
        let mut session = Session::new("chat", "Trip");
        assert_eq!(display_session_label(&session, true), "⭐️ 🟢 Trip");
        session.status = crate::bot::models::SessionStatus::Ended;
        assert_eq!(display_session_label(&session, false), "🔴 Trip");
    }
}
