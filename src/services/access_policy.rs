// src/services/access_policy.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Actor, Role},
};

/// Operações do núcleo que passam pela política de acesso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadCustomers,
    CreateCustomer,
    EditSalesDetails,
    VerifySales,
    EditFinance,
    VerifyAccounts,
    VerifyRto,
    RegisterVehicle,
    EditPostSale,
    UploadChassis,
    ReadChassis,
}

impl Operation {
    /// Tabela fixa: papel -> operações permitidas
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Operation::ReadCustomers | Operation::UploadChassis | Operation::ReadChassis => {
                &[Role::Admin, Role::SalesExecutive, Role::Accounts, Role::Rto]
            }
            Operation::CreateCustomer | Operation::EditSalesDetails | Operation::VerifySales => {
                &[Role::SalesExecutive]
            }
            Operation::EditFinance | Operation::VerifyAccounts => &[Role::Accounts],
            Operation::VerifyRto | Operation::RegisterVehicle | Operation::EditPostSale => &[Role::Rto],
        }
    }

    fn label(self) -> &'static str {
        match self {
            Operation::ReadCustomers => "consultar clientes",
            Operation::CreateCustomer => "cadastrar clientes",
            Operation::EditSalesDetails => "editar dados de venda",
            Operation::VerifySales => "verificar vendas",
            Operation::EditFinance => "editar financiamento",
            Operation::VerifyAccounts => "verificar contas",
            Operation::VerifyRto => "verificar RTO",
            Operation::RegisterVehicle => "registrar veículo",
            Operation::EditPostSale => "editar dados pós-venda",
            Operation::UploadChassis => "enviar foto de chassi",
            Operation::ReadChassis => "consultar chassi",
        }
    }
}

/// 1ª checagem de toda operação: o papel do ator.
pub fn authorize(actor: &Actor, operation: Operation) -> Result<(), AppError> {
    if operation.allowed_roles().contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "o papel {:?} não pode {}",
            actor.role,
            operation.label()
        )))
    }
}

/// Filial que limita a visão do ator. `None` = todas as filiais.
/// Papel com escopo de filial mas sem filial cadastrada não enxerga nada.
pub fn branch_scope(actor: &Actor) -> Result<Option<Uuid>, AppError> {
    if !actor.role.is_branch_scoped() {
        return Ok(None);
    }
    actor
        .branch_id
        .map(Some)
        .ok_or_else(|| AppError::Forbidden("usuário sem filial vinculada".into()))
}

/// 2ª checagem, feita contra o registro recém-lido.
pub fn ensure_branch(actor: &Actor, customer_branch_id: Uuid) -> Result<(), AppError> {
    match branch_scope(actor)? {
        Some(branch_id) if branch_id != customer_branch_id => Err(AppError::Forbidden(
            "cliente pertence a outra filial".into(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, branch_id: Option<Uuid>) -> Actor {
        Actor { user_id: Uuid::new_v4(), role, branch_id }
    }

    #[test]
    fn each_verification_belongs_to_exactly_one_role() {
        let all = [Role::Admin, Role::SalesExecutive, Role::Accounts, Role::Rto];
        let cases = [
            (Operation::VerifySales, Role::SalesExecutive),
            (Operation::VerifyAccounts, Role::Accounts),
            (Operation::VerifyRto, Role::Rto),
            (Operation::RegisterVehicle, Role::Rto),
        ];

        for (operation, owner) in cases {
            for role in all {
                let result = authorize(&actor(role, Some(Uuid::new_v4())), operation);
                assert_eq!(result.is_ok(), role == owner, "{operation:?} / {role:?}");
            }
        }
    }

    #[test]
    fn admin_reads_but_never_verifies() {
        let admin = actor(Role::Admin, None);
        assert!(authorize(&admin, Operation::ReadCustomers).is_ok());
        assert!(matches!(
            authorize(&admin, Operation::VerifySales),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn every_staff_role_handles_chassis_photos() {
        for role in [Role::Admin, Role::SalesExecutive, Role::Accounts, Role::Rto] {
            let staff = actor(role, Some(Uuid::new_v4()));
            assert!(authorize(&staff, Operation::UploadChassis).is_ok());
            assert!(authorize(&staff, Operation::ReadChassis).is_ok());
        }
    }

    #[test]
    fn branch_scope_applies_to_sales_and_accounts_only() {
        let branch_a = Uuid::new_v4();
        let branch_b = Uuid::new_v4();

        assert!(ensure_branch(&actor(Role::SalesExecutive, Some(branch_a)), branch_a).is_ok());
        assert!(matches!(
            ensure_branch(&actor(Role::SalesExecutive, Some(branch_a)), branch_b),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_branch(&actor(Role::Accounts, Some(branch_a)), branch_b),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_branch(&actor(Role::Rto, None), branch_b).is_ok());
        assert!(ensure_branch(&actor(Role::Admin, None), branch_b).is_ok());
    }

    #[test]
    fn scoped_role_without_branch_is_forbidden() {
        let orphan = actor(Role::Accounts, None);
        assert!(matches!(branch_scope(&orphan), Err(AppError::Forbidden(_))));
    }
}
