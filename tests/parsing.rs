// tests/parsing.rs
use grid_robot::{Command, CommandTable, Direction, ExecutionError, Op, parse, parse_with};

fn ops(source: &str) -> Vec<Op> {
    parse(source).instructions.into_iter().map(|i| i.op).collect()
}

#[test]
fn test_markers_and_blank_lines_are_dropped() {
    let program = parse("нач\n\n   вправо  \nвправо\nкон\n");
    assert_eq!(
        program.instructions.iter().map(|i| &i.op).collect::<Vec<_>>(),
        vec![
            &Op::Command("вправо".into()),
            &Op::Command("вправо".into())
        ]
    );
    // Lines are 1-based and count blank lines.
    assert_eq!(program.instructions[0].line, 3);
    assert_eq!(program.instructions[1].line, 4);
    assert!(program.skipped.is_empty());
}

#[test]
fn test_case_insensitive() {
    assert_eq!(
        ops("НАЧ\nНЦ Справа СВОБОДНО\nВправо\nКЦ\nКОН"),
        vec![
            Op::LoopStart("справа свободно".into()),
            Op::Command("вправо".into()),
            Op::LoopEnd,
        ]
    );
}

#[test]
fn test_block_keywords() {
    let source = "\
нц снизу свободно
  если справа стена то
    закрасить
  все
  вниз
кц
нц
кц";
    assert_eq!(
        ops(source),
        vec![
            Op::LoopStart("снизу свободно".into()),
            Op::IfStart("справа стена".into()),
            Op::Command("закрасить".into()),
            Op::IfEnd,
            Op::Command("вниз".into()),
            Op::LoopEnd,
            Op::LoopStart(String::new()),
            Op::LoopEnd,
        ]
    );
}

#[test]
fn test_unknown_lines_are_skipped_and_reported() {
    // "прыгнуть" is not a command and "алг" headers are not part of the subset.
    let program = parse("алг обход\nнач\nпрыгнуть\nвлево\nкц кц\nкон");
    assert_eq!(
        program
            .instructions
            .iter()
            .map(|i| i.op.clone())
            .collect::<Vec<_>>(),
        vec![Op::Command("влево".into())]
    );
    assert_eq!(program.skipped, vec![1, 3, 5]);
}

#[test]
fn test_command_prefix_match() {
    // Trailing text after a command keyword is ignored.
    assert_eq!(
        ops("вправо;\nзакрасить клетку"),
        vec![
            Op::Command("вправо".into()),
            Op::Command("закрасить".into())
        ]
    );
}

#[test]
fn test_custom_vocabulary() {
    let table = CommandTable::standard().with("направо", Command::Move(Direction::East));
    let program = parse_with("направо\nвправо", &table);
    assert_eq!(program.len(), 2);
    assert_eq!(program.instructions[0].op, Op::Command("направо".into()));

    // The standard parser does not know the alias.
    assert_eq!(parse("направо").len(), 0);
}

#[test]
fn test_balanced_blocks_check() {
    let program = parse("нц справа свободно\nнц снизу свободно\nвниз\nкц\nесли сверху стена то\nвправо\nвсе\nкц");
    assert_eq!(program.check_blocks(), Ok(()));
}

#[test]
fn test_unbalanced_blocks_check() {
    let program = parse("вправо\nнц справа свободно\nвправо\n");
    assert_eq!(
        program.check_blocks(),
        Err(ExecutionError::UnterminatedLoop { line: 2 })
    );

    let program = parse("если снизу свободно то\nвниз\n");
    assert_eq!(
        program.check_blocks(),
        Err(ExecutionError::UnterminatedConditional { line: 1 })
    );
}

#[test]
fn test_instruction_display() {
    let rendered: Vec<String> = parse("нц справа свободно\nесли снизу стена\nвсе\nкц\nнц\nкц")
        .instructions
        .iter()
        .map(|i| i.op.to_string())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "нц справа свободно",
            "если снизу стена то",
            "все",
            "кц",
            "нц",
            "кц"
        ]
    );
}

#[test]
fn test_block_keywords_are_whole_words() {
    // A keyword glued to its condition is not a loop header.
    let program = parse("нцсправа свободно\nвправо\nкц");
    assert_eq!(program.skipped, vec![1]);
    assert_eq!(program.instructions[0].op, Op::Command("вправо".into()));
    assert_eq!(program.instructions[1].op, Op::LoopEnd);
}
