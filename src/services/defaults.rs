use crate::models::board::{Board, BoardKind, BoardVariant};
use crate::models::field::{FieldConfig, FieldType};

pub const COMPLETED_BOARD: &str = "Concluídas";
pub const CANCELLED_BOARD: &str = "Canceladas";
pub const TRASH_BOARD: &str = "Lixeira";

pub fn boards() -> Vec<Board> {
    vec![
        Board::new("A Fazer", BoardKind::Regular, 0),
        Board::new("Em Andamento", BoardKind::Regular, 1),
        Board::new("Em Revisão", BoardKind::Regular, 2),
        Board::new(COMPLETED_BOARD, BoardKind::Completed, 0),
        Board::new(CANCELLED_BOARD, BoardKind::Cancelled, 1),
        Board::new(TRASH_BOARD, BoardKind::Trash, 0),
    ]
}

fn field(name: &str, label: &str, kind: FieldType, required: bool, options: &[&str], order: i32) -> FieldConfig {
    FieldConfig {
        field_name: name.to_string(),
        label: label.to_string(),
        kind,
        required,
        active: true,
        visible: true,
        options: options.iter().map(|o| o.to_string()).collect(),
        order,
    }
}

pub fn fields(variant: BoardVariant) -> Vec<FieldConfig> {
    let mut fields = vec![
        field("name", "Nome", FieldType::Text, true, &[], 0),
        field("atendente", "Atendente", FieldType::Text, false, &[], 1),
        field("pendencias", "Pendências", FieldType::Textarea, false, &[], 2),
    ];

    match variant {
        BoardVariant::Scrumboard => {
            fields.push(field("prioridade", "Prioridade", FieldType::Dropdown, false, &["Baixa", "Média", "Alta"], 3));
            fields.push(field("prazo", "Prazo", FieldType::Date, false, &[], 4));
        }
        BoardVariant::RegistroCivil => {
            fields.push(field(
                "tipo",
                "Tipo de Registro",
                FieldType::Dropdown,
                false,
                &["Nascimento", "Casamento", "Óbito", "Averbação"],
                3,
            ));
            fields.push(field("dataEntrada", "Data de Entrada", FieldType::Date, false, &[], 4));
            fields.push(field("telefone", "Telefone", FieldType::Text, false, &[], 5));
            fields.push(field("email", "E-mail", FieldType::Email, false, &[], 6));
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::PROTECTED_FIELDS;
    use crate::services::schema::validate_definition;

    #[test]
    fn test_default_fields_are_valid_and_include_protected() {
        for variant in BoardVariant::ALL {
            let fields = fields(variant);
            for f in &fields {
                validate_definition(f).unwrap();
            }
            for protected in PROTECTED_FIELDS {
                assert!(fields.iter().any(|f| f.field_name == protected));
            }
        }
    }

    #[test]
    fn test_default_boards_have_one_of_each_terminal_kind() {
        let boards = boards();
        for kind in [BoardKind::Completed, BoardKind::Cancelled, BoardKind::Trash] {
            assert_eq!(boards.iter().filter(|b| b.kind == kind).count(), 1);
        }
    }
}
