// tests/execution.rs
use glam::IVec2;
use grid_robot::{
    CellState, Command, CommandTable, Condition, ConditionError, Direction, Event, ExecutionError,
    Field, Interpreter, MotionMode, NullObserver, RunConfig, RunReport, Wall, parse,
};

fn setup() -> (Interpreter, Field) {
    (
        Interpreter::new(RunConfig::default()),
        Field::new(10).unwrap(),
    )
}

fn run(interpreter: &Interpreter, field: &mut Field, source: &str) -> Result<RunReport, ExecutionError> {
    interpreter.run(source, field, &mut NullObserver)
}

#[test]
fn test_orient_mode_only_turns() {
    // Direction commands only set the heading: no movement, no ticks.
    let interpreter = Interpreter::new(RunConfig::default().with_motion(MotionMode::Orient));
    let mut field = Field::new(10).unwrap();
    field.set_direction(Direction::North);

    let report = run(&interpreter, &mut field, "нач\nвправо\nвправо\nкон").unwrap();

    assert_eq!(field.robot().direction, Direction::East);
    assert_eq!(field.robot().position, IVec2::new(0, 0));
    assert!(report.ticks.is_empty(), "turning never ticks");
    assert_eq!(report.dispatched, 2);
}

#[test]
fn test_walk_until_wall_of_field() {
    let (interpreter, mut field) = setup();

    let report = run(&interpreter, &mut field, "нц справа свободно\nвправо\nкц").unwrap();

    assert_eq!(field.robot().position, IVec2::new(9, 0));
    assert_eq!(field.robot().direction, Direction::East);
    assert_eq!(report.ticks.len(), 9);
    assert_eq!(
        report.path(),
        (1..=9).map(|x| IVec2::new(x, 0)).collect::<Vec<_>>()
    );
}

#[test]
fn test_blocked_move_keeps_position() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::vertical(1, 0)).unwrap();

    let err = run(&interpreter, &mut field, "вправо").unwrap_err();

    assert_eq!(
        err,
        ExecutionError::BlockedMove {
            from: IVec2::new(0, 0),
            to: IVec2::new(1, 0),
            line: 1
        }
    );
    assert_eq!(err.kind(), "blocked_move");
    assert_eq!(field.robot().position, IVec2::new(0, 0));
}

#[test]
fn test_leaving_the_field_is_blocked() {
    let (interpreter, mut field) = setup();
    let err = run(&interpreter, &mut field, "вверх").unwrap_err();
    assert!(matches!(err, ExecutionError::BlockedMove { .. }));
    assert_eq!(field.robot().position, IVec2::ZERO);
}

#[test]
fn test_changes_before_error_are_kept() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::vertical(3, 0)).unwrap();

    let err = run(&interpreter, &mut field, "закрасить\nвправо\nвправо\nвправо").unwrap_err();

    assert!(matches!(err, ExecutionError::BlockedMove { line: 4, .. }));
    assert_eq!(field.robot().position, IVec2::new(2, 0));
    assert!(field.is_painted(IVec2::ZERO));
}

#[test]
fn test_false_loop_runs_zero_times() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::horizontal(0, 1)).unwrap();

    let report = run(
        &interpreter,
        &mut field,
        "нц снизу свободно\nвниз\nзакрасить\nкц\nвправо",
    )
    .unwrap();

    // The body is skipped and execution resumes right after кц.
    assert_eq!(field.robot().position, IVec2::new(1, 0));
    assert_eq!(field.painted().count(), 0);
    assert_eq!(report.ticks.len(), 1);
    assert_eq!(report.ticks[0].line, 5);
}

#[test]
fn test_nested_loops_snake_through_two_columns() {
    let (interpreter, mut field) = setup();
    // Snake down the first two columns: walk down column 0, step right, walk up column 1.
    let source = "\
нц снизу свободно
  закрасить
  вниз
кц
закрасить
вправо
нц сверху свободно
  нц слева стена
    закрасить
    вверх
  кц
  вверх
кц";
    let report = run(&interpreter, &mut field, source);

    // Column 1 has no walls on its left, so the inner loop never runs.
    // The outer loop then walks up to the top row.
    assert!(report.is_ok(), "{report:?}");
    assert_eq!(field.robot().position, IVec2::new(1, 0));
    assert_eq!(field.painted().count(), 10);
    assert!((0..10).all(|y| field.is_painted(IVec2::new(0, y))));
}

#[test]
fn test_inner_loop_re_checks_its_own_condition() {
    let (interpreter, mut field) = setup();
    // Walls on the left of column 1 for rows 0..3.
    for y in 0..3 {
        field.add_wall(Wall::vertical(1, y)).unwrap();
    }
    field.move_robot_to(IVec2::new(1, 3));

    let source = "\
нц сверху свободно
  нц слева стена
    закрасить
    вверх
  кц
  вверх
кц";
    // At (1,3) the left side is free, so the outer loop steps up to (1,2).
    // From there the inner loop paints (1,2) and (1,1), then paints (1,0) and
    // tries to go up out of the field.
    let err = run(&interpreter, &mut field, source).unwrap_err();
    assert!(matches!(err, ExecutionError::BlockedMove { line: 4, .. }));
    assert_eq!(field.robot().position, IVec2::new(1, 0));
    assert_eq!(field.painted().count(), 3);
}

#[test]
fn test_conditional_true_and_false() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::horizontal(1, 1)).unwrap();

    let source = "\
нц справа свободно
  вправо
  если снизу стена то
    закрасить
  все
кц";
    run(&interpreter, &mut field, source).unwrap();

    // Only the cell above the wall is painted.
    let painted: Vec<IVec2> = field.painted().copied().collect();
    assert_eq!(painted, vec![IVec2::new(1, 0)]);
}

#[test]
fn test_conditional_skips_to_first_terminator() {
    let (interpreter, mut field) = setup();
    // The outer condition is false, so execution jumps past the first все.
    // The second все is then a no-op and вниз still runs.
    let source = "\
если сверху свободно то
  если снизу свободно то
    вправо
  все
  вправо
все
вниз";
    let report = run(&interpreter, &mut field, source).unwrap();
    assert_eq!(field.robot().position, IVec2::new(1, 1));
    assert_eq!(report.ticks.len(), 2);
}

#[test]
fn test_unterminated_blocks_fail_when_reached() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::vertical(1, 1)).unwrap();

    // The condition is false on entry, so the resolver must find кц and cannot.
    let err = run(&interpreter, &mut field, "вниз\nнц справа свободно\nвправо").unwrap_err();
    assert_eq!(err, ExecutionError::UnterminatedLoop { line: 2 });
    // The move before the broken block already happened.
    assert_eq!(field.robot().position, IVec2::new(0, 1));

    let err = run(&interpreter, &mut field, "если сверху стена то\nвправо").unwrap_err();
    assert_eq!(err, ExecutionError::UnterminatedConditional { line: 1 });
}

#[test]
fn test_stray_loop_end() {
    let (interpreter, mut field) = setup();
    let err = run(&interpreter, &mut field, "вправо\nкц").unwrap_err();
    assert_eq!(err, ExecutionError::UnmatchedLoopEnd { line: 2 });
}

#[test]
fn test_invalid_conditions() {
    let (interpreter, mut field) = setup();

    let err = run(&interpreter, &mut field, "если спереди свободно то\nвсе").unwrap_err();
    assert_eq!(
        err,
        ExecutionError::InvalidCondition {
            text: "спереди свободно".into(),
            line: 1,
            reason: ConditionError::UnknownSide("спереди".into()),
        }
    );

    let err = run(&interpreter, &mut field, "нц справа занято\nкц").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::InvalidCondition {
            reason: ConditionError::UnknownState(_),
            ..
        }
    ));

    let err = run(&interpreter, &mut field, "если то\nвсе").unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::InvalidCondition {
            reason: ConditionError::Empty,
            ..
        }
    ));
}

#[test]
fn test_unconditional_loop_hits_step_limit() {
    let interpreter = Interpreter::new(RunConfig::default().with_max_steps(50));
    let mut field = Field::new(10).unwrap();

    let err = run(&interpreter, &mut field, "нц\nзакрасить\nкц").unwrap_err();
    assert_eq!(err, ExecutionError::StepLimitExceeded { limit: 50 });
    assert_eq!(field.painted().count(), 1);
}

#[test]
fn test_unconditional_loop_ends_at_wall() {
    let (interpreter, mut field) = setup();
    let err = run(&interpreter, &mut field, "нц\nвниз\nкц").unwrap_err();
    assert!(matches!(err, ExecutionError::BlockedMove { .. }));
    assert_eq!(field.robot().position, IVec2::new(0, 9));
}

#[test]
fn test_unknown_command_fails_closed() {
    // Parsed with a richer vocabulary than the interpreter knows.
    let rich = CommandTable::standard().with("прыжок", Command::Move(Direction::East));
    let program = grid_robot::parse_with("закрасить\nпрыжок\nвниз", &rich);

    let (interpreter, mut field) = setup();
    let err = interpreter
        .execute(&program, &mut field, &mut NullObserver)
        .unwrap_err();
    assert_eq!(
        err,
        ExecutionError::UnknownCommand {
            keyword: "прыжок".into(),
            line: 2
        }
    );
    assert!(field.is_painted(IVec2::ZERO));
    assert_eq!(field.robot().position, IVec2::ZERO);
}

#[test]
fn test_observer_sees_every_change() {
    let (interpreter, mut field) = setup();
    field.add_wall(Wall::vertical(2, 0)).unwrap();

    let mut events = Vec::new();
    let mut observer = |event: &Event, field: &Field| {
        events.push((*event, field.robot().position));
    };
    let result = interpreter.run("вправо\nзакрасить\nвправо", &mut field, &mut observer);
    assert!(result.is_err());

    assert_eq!(
        events,
        vec![
            (
                Event::Moved {
                    from: IVec2::new(0, 0),
                    to: IVec2::new(1, 0),
                    direction: Direction::East
                },
                IVec2::new(1, 0)
            ),
            (
                Event::Painted {
                    cell: IVec2::new(1, 0),
                    fresh: true
                },
                IVec2::new(1, 0)
            ),
            (
                Event::WallHit {
                    at: IVec2::new(1, 0),
                    towards: IVec2::new(2, 0)
                },
                IVec2::new(1, 0)
            ),
        ]
    );
}

#[test]
fn test_machine_steps_one_instruction_at_a_time() {
    let (interpreter, mut field) = setup();
    let program = parse("нц справа свободно\nвправо\nкц");
    let mut machine = interpreter.machine(&program);

    use grid_robot::Dispatch;
    assert_eq!(machine.step(&mut field), Ok(Dispatch::Silent));
    assert_eq!(machine.pc(), 1);
    assert!(matches!(machine.step(&mut field), Ok(Dispatch::Tick(Event::Moved { .. }))));
    assert_eq!(machine.step(&mut field), Ok(Dispatch::Silent));
    // кц jumps back onto нц so its condition is checked again.
    assert_eq!(machine.pc(), 0);
    assert_eq!(machine.dispatched(), 3);
    assert!(!machine.is_halted());

    while machine.step(&mut field) != Ok(Dispatch::Halted) {}
    assert!(machine.is_halted());
    assert_eq!(field.robot().position, IVec2::new(9, 0));
}

#[test]
fn test_condition_ignores_heading() {
    let mut field = Field::new(3).unwrap();
    field.move_robot_to(IVec2::new(2, 1));
    for direction in Direction::ALL {
        field.set_direction(direction);
        let right: Condition = "справа свободно".parse().unwrap();
        assert!(!right.holds(&field), "east edge of the field");
        let left = Condition::new(Direction::West, CellState::Free);
        assert!(left.holds(&field));
    }

    assert_eq!(grid_robot::evaluate("справа стена", &field), Ok(true));
    assert_eq!(
        grid_robot::evaluate("справа", &field),
        Err(ConditionError::Arity(1))
    );
}
