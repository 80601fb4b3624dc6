// src/services/pricing.rs

use rust_decimal::Decimal;

use crate::{common::error::AppError, models::customer::Customer};

/// Soma exata dos itens do preço. Campos ausentes contam como zero.
pub fn compute_total(
    ex_showroom: Option<Decimal>,
    tax: Option<Decimal>,
    insurance: Option<Decimal>,
    tp_registration: Option<Decimal>,
    man_accessories: Option<Decimal>,
    optional_accessories: Option<Decimal>,
) -> Decimal {
    [
        ex_showroom,
        tax,
        insurance,
        tp_registration,
        man_accessories,
        optional_accessories,
    ]
    .into_iter()
    .flatten()
    .sum()
}

/// Saldo devedor. Pode ser negativo (pagamento a maior) e isso é válido.
pub fn compute_balance(
    total_price: Decimal,
    finance_amount: Option<Decimal>,
    amount_paid: Option<Decimal>,
) -> Decimal {
    total_price - finance_amount.unwrap_or(Decimal::ZERO) - amount_paid.unwrap_or(Decimal::ZERO)
}

/// Recalcula total e saldo juntos, na mesma escrita em memória.
/// Toda transição que toca preço, financiamento ou pagamento passa por aqui antes de persistir.
pub fn recalculate(customer: &mut Customer) {
    customer.total_price = compute_total(
        customer.ex_showroom_price,
        customer.tax,
        customer.insurance,
        customer.tp_registration,
        customer.man_accessories,
        customer.optional_accessories,
    );
    customer.balance_amount = compute_balance(
        customer.total_price,
        customer.finance_amount,
        customer.amount_paid,
    );
}

// Limite de NUMERIC(12,2): 10 dígitos inteiros
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Valores monetários informados: sem sinal negativo, no máximo 2 casas decimais
/// e abaixo de 10 bilhões (o que cabe em `NUMERIC(12,2)`).
pub fn validate_amounts(customer: &Customer) -> Result<(), AppError> {
    let fields: [(&'static str, Option<Decimal>); 9] = [
        ("exShowroomPrice", customer.ex_showroom_price),
        ("tax", customer.tax),
        ("insurance", customer.insurance),
        ("tpRegistration", customer.tp_registration),
        ("manAccessories", customer.man_accessories),
        ("optionalAccessories", customer.optional_accessories),
        ("bookingAmount", customer.booking_amount),
        ("financeAmount", customer.finance_amount),
        ("amountPaid", customer.amount_paid),
    ];

    for (field, value) in fields {
        if let Some(amount) = value {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(AppError::invalid_field(
                    field,
                    "negative_amount",
                    "O valor não pode ser negativo.",
                ));
            }
            if amount.normalize().scale() > 2 {
                return Err(AppError::invalid_field(
                    field,
                    "too_many_decimals",
                    "Use no máximo 2 casas decimais.",
                ));
            }
            if amount.abs() >= MAX_AMOUNT {
                return Err(AppError::invalid_field(
                    field,
                    "amount_out_of_range",
                    "Valor acima do limite permitido.",
                ));
            }
        }
    }

    Ok(())
}
