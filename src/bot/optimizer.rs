use std::{cmp::Ordering, collections::HashMap};

use crate::bot::{
    constants::misc::{ADVANCE_THRESHOLD, SETTLED_EPSILON, TRANSFER_THRESHOLD},
    models::{Member, Transaction},
};

#[derive(Debug, Clone, PartialEq)]
pub struct MemberBalance {
    pub member_id: String,
    pub username: String,
    // Paid minus consumed. Positive means the member is owed money.
    pub balance: i64,
    pub total_paid: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetPosition {
    pub member_id: String,
    pub username: String,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPayment {
    pub from_id: String,
    pub from: String,
    pub to_id: String,
    pub to: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberPayment {
    pub member_id: String,
    pub username: String,
    pub total_paid: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSummary {
    pub total_expenses: i64,
    pub member_count: usize,
    pub payments: Vec<MemberPayment>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settlement {
    pub plan: Vec<PlannedPayment>,
    pub balances: Vec<MemberBalance>,
    pub summary: Option<SettlementSummary>,
}

// Accumulates paid and consumed amounts per member, in member order.
pub fn compute_balances(members: &[Member], transactions: &[Transaction]) -> Vec<MemberBalance> {
    let mut balances: Vec<MemberBalance> = members
        .iter()
        .map(|member| MemberBalance {
            member_id: member.id.clone(),
            username: member.username.clone(),
            balance: 0,
            total_paid: 0,
        })
        .collect();
    let index: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .map(|(i, member)| (member.id.as_str(), i))
        .collect();

    for transaction in transactions {
        match index.get(transaction.payer_id.as_str()) {
            Some(&i) => {
                balances[i].balance += transaction.amount;
                balances[i].total_paid += transaction.amount;
            }
            None => log::warn!(
                "Transaction {} has unknown payer {}",
                transaction.id,
                transaction.payer_id
            ),
        }
        match index.get(transaction.consumer_id.as_str()) {
            Some(&i) => balances[i].balance -= transaction.amount,
            None => log::warn!(
                "Transaction {} has unknown consumer {}",
                transaction.id,
                transaction.consumer_id
            ),
        }
    }

    balances
}

/* Greedy settlement.
 * Matches the largest debtor with the largest creditor until one side runs out.
 * Not minimal in the number of payments, but deterministic and it always balances
 * the ledger. Amounts are rounded only when a payment is recorded.
 */
pub fn optimize_settlement(positions: &[NetPosition]) -> Vec<PlannedPayment> {
    let mut debtors: Vec<NetPosition> = positions
        .iter()
        .filter(|p| p.balance < -SETTLED_EPSILON)
        .cloned()
        .collect();
    let mut creditors: Vec<NetPosition> = positions
        .iter()
        .filter(|p| p.balance > SETTLED_EPSILON)
        .cloned()
        .collect();

    // Stable sorts, so ties keep member order
    debtors.sort_by(|a, b| a.balance.partial_cmp(&b.balance).unwrap_or(Ordering::Equal));
    creditors.sort_by(|a, b| b.balance.partial_cmp(&a.balance).unwrap_or(Ordering::Equal));

    let mut plan = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let debtor = &mut debtors[i];
        let creditor = &mut creditors[j];
        let amount = (-debtor.balance).min(creditor.balance);

        if amount > TRANSFER_THRESHOLD {
            plan.push(PlannedPayment {
                from_id: debtor.member_id.clone(),
                from: debtor.username.clone(),
                to_id: creditor.member_id.clone(),
                to: creditor.username.clone(),
                amount: amount.round() as i64,
            });
        }

        debtor.balance += amount;
        creditor.balance -= amount;

        if debtor.balance.abs() < ADVANCE_THRESHOLD {
            i += 1;
        }
        if creditor.balance.abs() < ADVANCE_THRESHOLD {
            j += 1;
        }
    }

    plan
}

// Computes balances, the summary and the settlement plan for one session snapshot.
pub fn calculate_settlement(members: &[Member], transactions: &[Transaction]) -> Settlement {
    if members.is_empty() {
        return Settlement::default();
    }

    let balances = compute_balances(members, transactions);
    let total_expenses = transactions.iter().map(|t| t.amount).sum();
    let summary = SettlementSummary {
        total_expenses,
        member_count: members.len(),
        payments: balances
            .iter()
            .map(|b| MemberPayment {
                member_id: b.member_id.clone(),
                username: b.username.clone(),
                total_paid: b.total_paid,
            })
            .collect(),
    };

    let positions: Vec<NetPosition> = balances
        .iter()
        .map(|b| NetPosition {
            member_id: b.member_id.clone(),
            username: b.username.clone(),
            balance: b.balance as f64,
        })
        .collect();
    let plan = optimize_settlement(&positions);

    Settlement {
        plan,
        balances,
        summary: Some(summary),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::bot::models::MemberKind;

    fn member(name: &str) -> Member {
        Member {
            id: format!("id-{name}"),
            session_id: "s1".to_string(),
            kind: MemberKind::FreeText,
            username: name.to_string(),
        }
    }

    fn pays(payer: &str, consumer: &str, amount: i64) -> Transaction {
        Transaction {
            id: format!("{payer}-{consumer}-{amount}"),
            session_id: "s1".to_string(),
            payer_id: format!("id-{payer}"),
            consumer_id: format!("id-{consumer}"),
            amount,
            description: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn position(name: &str, balance: f64) -> NetPosition {
        NetPosition {
            member_id: format!("id-{name}"),
            username: name.to_string(),
            balance,
        }
    }

    // Applies a plan to the balances it was computed from.
    fn apply(balances: &[MemberBalance], plan: &[PlannedPayment]) -> HashMap<String, i64> {
        let mut remaining: HashMap<String, i64> = balances
            .iter()
            .map(|b| (b.member_id.clone(), b.balance))
            .collect();
        for payment in plan {
            *remaining.get_mut(&payment.from_id).unwrap() += payment.amount;
            *remaining.get_mut(&payment.to_id).unwrap() -= payment.amount;
        }
        remaining
    }

    #[test]
    fn test_two_members_offsetting() {
        let members = vec![member("A"), member("B")];
        let transactions = vec![pays("A", "B", 100), pays("B", "A", 40)];

        let settlement = calculate_settlement(&members, &transactions);
        let balances: Vec<i64> = settlement.balances.iter().map(|b| b.balance).collect();
        assert_eq!(balances, vec![60, -60]);
        assert_eq!(
            settlement.plan,
            vec![PlannedPayment {
                from_id: "id-B".to_string(),
                from: "B".to_string(),
                to_id: "id-A".to_string(),
                to: "A".to_string(),
                amount: 60,
            }]
        );

        let summary = settlement.summary.unwrap();
        assert_eq!(summary.total_expenses, 140);
        assert_eq!(summary.member_count, 2);
        assert_eq!(summary.payments[0].total_paid, 100);
        assert_eq!(summary.payments[1].total_paid, 40);
    }

    #[test]
    fn test_self_consumption_is_neutral() {
        let members = vec![member("A"), member("B")];
        let transactions = vec![pays("A", "B", 100), pays("B", "A", 40), pays("A", "A", 20)];

        let settlement = calculate_settlement(&members, &transactions);
        assert_eq!(settlement.balances[0].balance, 60);
        assert_eq!(settlement.balances[0].total_paid, 120);
        assert_eq!(settlement.plan.len(), 1);
        assert_eq!(settlement.plan[0].amount, 60);
        assert_eq!(settlement.summary.unwrap().total_expenses, 160);
    }

    #[test]
    fn test_no_members() {
        let settlement = calculate_settlement(&[], &[]);
        assert!(settlement.plan.is_empty());
        assert_eq!(settlement.summary, None);
    }

    #[test]
    fn test_members_without_transactions() {
        let settlement = calculate_settlement(&[member("A"), member("B")], &[]);
        assert!(settlement.plan.is_empty());
        assert_eq!(settlement.summary.unwrap().total_expenses, 0);
    }

    #[test]
    fn test_single_member() {
        let members = vec![member("A")];
        let transactions = vec![pays("A", "A", 50_000)];

        let settlement = calculate_settlement(&members, &transactions);
        assert!(settlement.plan.is_empty());
        let summary = settlement.summary.unwrap();
        assert_eq!(summary.member_count, 1);
        assert_eq!(summary.total_expenses, 50_000);
    }

    #[test]
    fn test_half_unit_transfer_is_dropped() {
        let plan = optimize_settlement(&[position("A", 0.5), position("B", -0.5)]);
        assert!(plan.is_empty());

        let plan = optimize_settlement(&[position("A", 0.6), position("B", -0.6)]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].amount, 1);
    }

    #[test]
    fn test_half_unit_keeps_summary() {
        // Session summaries are unaffected by dropped transfers
        let members = vec![member("A"), member("B")];
        let transactions = vec![pays("A", "A", 10)];
        let settlement = calculate_settlement(&members, &transactions);
        assert!(settlement.plan.is_empty());
        assert_eq!(settlement.summary.unwrap().payments[0].total_paid, 10);
    }

    #[test]
    fn test_rounds_only_final_transfer() {
        let plan = optimize_settlement(&[
            position("A", 10.5),
            position("B", -5.25),
            position("C", -5.25),
        ]);
        let amounts: Vec<i64> = plan.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![5, 5]);
    }

    #[test]
    fn test_largest_debtor_pays_largest_creditor_first() {
        let members = vec![member("A"), member("B"), member("C"), member("D")];
        // A: +90, B: +10, C: -70, D: -30
        let transactions = vec![
            pays("A", "C", 70),
            pays("A", "D", 20),
            pays("B", "D", 10),
        ];

        let settlement = calculate_settlement(&members, &transactions);
        let plan: Vec<(String, String, i64)> = settlement
            .plan
            .iter()
            .map(|p| (p.from.clone(), p.to.clone(), p.amount))
            .collect();
        assert_eq!(
            plan,
            vec![
                ("C".to_string(), "A".to_string(), 70),
                ("D".to_string(), "A".to_string(), 20),
                ("D".to_string(), "B".to_string(), 10),
            ]
        );
    }

    #[test]
    fn test_conservation_and_full_settlement() {
        let names = ["A", "B", "C", "D", "E", "F"];
        let members: Vec<Member> = names.iter().map(|n| member(n)).collect();
        let mut transactions = Vec::new();
        for (i, payer) in names.iter().enumerate() {
            for (j, consumer) in names.iter().enumerate() {
                let amount = ((i * 37 + j * 53) % 97) as i64 * 1000 + (i as i64) * 7;
                transactions.push(pays(payer, consumer, amount));
            }
        }

        let settlement = calculate_settlement(&members, &transactions);
        let total: i64 = settlement.balances.iter().map(|b| b.balance).sum();
        assert_eq!(total, 0);

        assert!(settlement.plan.len() <= members.len() - 1);
        for (_, remaining) in apply(&settlement.balances, &settlement.plan) {
            assert!(remaining.abs() < 1, "left over {remaining}");
        }
    }

    #[test]
    fn test_unknown_member_counts_toward_total_only() {
        let members = vec![member("A"), member("B")];
        let transactions = vec![pays("A", "B", 30), pays("Ghost", "A", 5)];

        let settlement = calculate_settlement(&members, &transactions);
        assert_eq!(settlement.summary.unwrap().total_expenses, 35);
        assert_eq!(settlement.balances[0].balance, 25);
        assert_eq!(settlement.balances[1].balance, -30);
    }
}
