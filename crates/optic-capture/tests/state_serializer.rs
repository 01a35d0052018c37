mod common;

use bytes::Bytes;
use common::{capture_context, Event, Recording, RecordingEncoder};
use optic_capture::{CallObserver, StateSerializer, SerializerOptions};
use optic_memory::{Observation, ObservationData};
use optic_runtime::{make_pool, write_pool_data, Slice};
use pretty_assertions::assert_eq;

fn serializer_parts(recording: &Recording) -> CallObserver {
    CallObserver::new(Box::new(RecordingEncoder::new(recording.clone())))
}

#[test]
fn one_observation_per_pool_per_serialization() {
    let mut ctx = capture_context();
    let pool = make_pool(&mut ctx, 4).unwrap();
    write_pool_data(&mut ctx, pool, 0, &[1, 2, 3, 4]).unwrap();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);
    let mut serializer = StateSerializer::new(&mut observer, SerializerOptions::default());

    serializer
        .prepare_for_state(&mut ctx, |serializer, ctx| {
            serializer.encode_slice(ctx, &Slice::new(pool, 0, 0, 4, 4))?;
            serializer.encode_slice(ctx, &Slice::new(pool, 0, 2, 2, 2))?;
            serializer.encode_slice(ctx, &Slice::default())?; // application pool
            Ok(())
        })
        .unwrap();

    let observations = recording.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].pool, pool);
    assert_eq!(observations[0].base, 0);
    assert_eq!(
        observations[0].data,
        ObservationData::Inline(Bytes::from_static(&[1, 2, 3, 4]))
    );
}

#[test]
fn observation_precedes_later_references_to_the_pool() {
    let mut ctx = capture_context();
    let pool = make_pool(&mut ctx, 2).unwrap();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);
    let mut serializer = StateSerializer::new(&mut observer, SerializerOptions::default());

    serializer
        .prepare_for_state(&mut ctx, |serializer, ctx| {
            serializer.encode_slice(ctx, &Slice::new(pool, 0, 0, 2, 2))?;
            serializer.encode_slice(ctx, &Slice::new(pool, 0, 0, 1, 1))?;
            Ok(())
        })
        .unwrap();

    let events = recording.events.borrow();
    let observation_at = events
        .iter()
        .position(|e| matches!(e, Event::Observation(_)))
        .unwrap();
    let second_slice_at = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, Event::Slice(s) if !s.is_app_pool()))
        .map(|(i, _)| i)
        .nth(1)
        .unwrap();
    assert!(observation_at < second_slice_at);
}

#[test]
fn serializations_are_independent() {
    let mut ctx = capture_context();
    let pool = make_pool(&mut ctx, 2).unwrap();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);

    for _ in 0..2 {
        let mut serializer = StateSerializer::new(&mut observer, SerializerOptions::default());
        serializer
            .prepare_for_state(&mut ctx, |serializer, ctx| {
                serializer.encode_slice(ctx, &Slice::new(pool, 0, 0, 2, 2))
            })
            .unwrap();
    }

    // A fresh serialization observes the pool again, exactly once.
    assert_eq!(recording.observations().len(), 2);
}

#[test]
fn create_pool_reuses_the_empty_resource_sentinel() {
    let mut ctx = capture_context();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);
    let mut serializer = StateSerializer::new(&mut observer, SerializerOptions::default());

    let (a, b) = serializer
        .prepare_for_state(&mut ctx, |serializer, ctx| {
            let a = serializer.create_pool(ctx, 16, None)?;
            let b = serializer.create_pool(ctx, 16, None)?;
            // Later slices over created pools emit nothing further.
            serializer.encode_slice(ctx, &Slice::new(a, 0, 0, 16, 16))?;
            Ok((a, b))
        })
        .unwrap();
    assert!(a < b);

    assert_eq!(recording.resources.borrow().len(), 1);
    assert_eq!(recording.resources.borrow()[0], Vec::<u8>::new());

    let observations = recording.observations();
    assert_eq!(observations.len(), 2);
    for (observation, pool) in observations.iter().zip([a, b]) {
        assert_eq!(observation.pool, pool);
        assert_eq!(observation.base, 0);
        assert_eq!(
            observation.data,
            ObservationData::Resource {
                size: 0,
                res_index: 0
            }
        );
    }
}

#[test]
fn create_pool_with_an_init_observation() {
    let mut ctx = capture_context();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);
    let mut serializer = StateSerializer::new(&mut observer, SerializerOptions::default());

    serializer
        .prepare_for_state(&mut ctx, |serializer, ctx| {
            let init = |observation: &mut Observation| {
                observation.data = ObservationData::Inline(Bytes::from_static(&[7, 8, 9]));
            };
            serializer.create_pool(ctx, 3, Some(&init))?;
            Ok(())
        })
        .unwrap();

    assert!(recording.resources.borrow().is_empty());
    let observations = recording.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(
        observations[0].data,
        ObservationData::Inline(Bytes::from_static(&[7, 8, 9]))
    );
}

#[test]
fn large_observations_route_through_the_resource_stream() {
    let mut ctx = capture_context();
    let pool = make_pool(&mut ctx, 8).unwrap();
    write_pool_data(&mut ctx, pool, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

    let recording = Recording::default();
    let mut observer = serializer_parts(&recording);
    let options = SerializerOptions {
        max_inline_observation: 4,
    };
    let mut serializer = StateSerializer::new(&mut observer, options);

    serializer
        .prepare_for_state(&mut ctx, |serializer, ctx| {
            serializer.encode_slice(ctx, &Slice::new(pool, 0, 0, 8, 8))
        })
        .unwrap();

    assert_eq!(recording.resources.borrow().len(), 1);
    assert_eq!(recording.resources.borrow()[0], vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let observations = recording.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(
        observations[0].data,
        ObservationData::Resource {
            size: 8,
            res_index: 0
        }
    );
}
