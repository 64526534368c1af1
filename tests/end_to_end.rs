//! Drives [`squall::MySqlConnection`] over an in-memory duplex pipe against
//! a scripted fake server, the same way `sqlx-core`'s own packet tests build
//! hand-crafted wire fixtures, extended here to whole command/response
//! exchanges instead of single packets.

mod support;

use squall::protocol::TypeId;
use squall::statement::StatementOutcome;
use squall::{CallableStatement, Commander};

use support::*;

#[tokio::test]
async fn round_trips_an_int_and_a_string_through_a_server_prepared_statement() {
    let mut conn = connect_with_server(|mut io| async move {
        handshake_and_auth(&mut io).await;
        respond(&mut io, &prepare_ok_response(1, 1, 0)).await;
        respond(
            &mut io,
            &binary_result_set(
                &["int", "varchar"],
                &[BinaryCol::Int(2147483647), BinaryCol::Str("varchar")],
                AUTOCOMMIT_STATUS,
            ),
        )
        .await;
    })
    .await;

    let mut stmt = conn
        .prepare("SELECT int, varchar FROM all_types WHERE int = ?")
        .await
        .unwrap();
    stmt.set(1, 2147483647i32).unwrap();

    let outcome = stmt.execute(&mut conn).await.unwrap();
    let StatementOutcome::Rows(mut rows) = outcome else {
        panic!("expected a result set, got an update count");
    };

    assert!(rows.next());
    assert_eq!(rows.get::<i32>(1).unwrap(), 2147483647);
    assert_eq!(rows.get::<String>(2).unwrap(), "varchar");
    assert!(!rows.next());
}

async fn savepoint_scenario(release: bool, expected_count: &'static str) {
    let mut conn = connect_with_server(move |mut io| async move {
        handshake_and_auth(&mut io).await;
        respond(&mut io, &ok_response()).await; // SET autocommit=0
        respond(&mut io, &ok_response()).await; // INSERT ... (1)
        respond(&mut io, &ok_response()).await; // SAVEPOINT s
        respond(&mut io, &ok_response()).await; // INSERT ... (2)
        respond(&mut io, &ok_response()).await; // ROLLBACK TO / RELEASE SAVEPOINT s
        respond(&mut io, &ok_response()).await; // COMMIT
        respond(
            &mut io,
            &text_result_set(&[("count", TYPE_LONG)], &[vec![expected_count]], AUTOCOMMIT_STATUS),
        )
        .await;
    })
    .await;

    conn.set_auto_commit(false).await.unwrap();
    conn.execute("INSERT INTO demo_ids (id) VALUES (1)").await.unwrap();
    let savepoint = conn.set_savepoint(Some("s".to_owned())).await.unwrap();
    conn.execute("INSERT INTO demo_ids (id) VALUES (2)").await.unwrap();

    if release {
        conn.release_savepoint(&savepoint).await.unwrap();
    } else {
        conn.rollback_to_savepoint(&savepoint).await.unwrap();
    }
    conn.commit().await.unwrap();

    let mut rows = conn.query_one("SELECT count(*) FROM demo_ids WHERE id IN (1, 2)").await.unwrap();
    assert_eq!(rows.get::<i64>(1).unwrap(), expected_count.parse::<i64>().unwrap());
}

#[tokio::test]
async fn rollback_to_savepoint_undoes_only_the_second_insert() {
    savepoint_scenario(false, "1").await;
}

#[tokio::test]
async fn releasing_a_savepoint_keeps_both_inserts() {
    savepoint_scenario(true, "2").await;
}

#[tokio::test]
async fn stored_procedure_returns_result_sets_and_an_out_parameter() {
    let mut conn = connect_with_server(|mut io| async move {
        handshake_and_auth(&mut io).await;
        respond(&mut io, &prepare_ok_response(1, 2, 0)).await;

        let mut packets = Vec::new();
        packets.extend(binary_result_set(&["col"], &[BinaryCol::Str("abcdefg")], more_results_status()));
        packets.extend(binary_result_set(&["col"], &[BinaryCol::Str("zyxwabcdefg")], more_results_status()));
        packets.extend(binary_result_set(
            &["in_echo", "out_value"],
            &[BinaryCol::Str("abcdefg"), BinaryCol::Int(2)],
            out_params_status(),
        ));
        respond(&mut io, &packets).await;
    })
    .await;

    let mut stmt = CallableStatement::call("CALL demoSp(?, ?)");
    stmt.set(1, "abcdefg".to_owned()).unwrap();
    stmt.set(2, 1i32).unwrap();
    stmt.register_out_parameter(2, TypeId::LONG);

    let mut result_sets = stmt.execute(&mut conn).await.unwrap();
    assert_eq!(result_sets.len(), 2);

    assert!(result_sets[0].next());
    assert_eq!(result_sets[0].get::<String>(1).unwrap(), "abcdefg");

    assert!(result_sets[1].next());
    assert_eq!(result_sets[1].get::<String>(1).unwrap(), "zyxwabcdefg");

    assert_eq!(stmt.get_out::<i32>(2).unwrap(), 2);
}
