mod util;
use util::*;

use bytemuck::cast_slice;
use mesh_halo::algs::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
use serial_test::serial;
use std::time::Duration;

#[test]
#[serial]
fn rayon_round_trip() {
    let tag = CommTag(0x1000);
    let (c0, c1) = rayons();

    let msg = b"hello";
    let _s = c0.isend(1, tag.base(), msg);

    let mut buf = [0u8; 5];
    let h = c1.irecv(0, tag.base(), &mut buf);
    let got = h.wait().unwrap();
    assert_eq!(&got, msg);
}

#[test]
#[serial]
fn rayon_fifo_order() {
    let tag = CommTag(0x1001);
    let (c0, c1) = rayons();

    for i in 0..10u8 {
        let _ = c0.isend(1, tag.base(), &[i]);
    }
    let mut out = Vec::new();
    for _ in 0..10 {
        let mut b = [0u8; 1];
        let h = c1.irecv(0, tag.base(), &mut b);
        out.push(h.wait().unwrap()[0]);
    }
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
#[serial]
fn oversized_message_is_not_truncated() {
    let tag = CommTag(0x1002);
    let (c0, c1) = rayons();

    let _ = c0.isend(1, tag.base(), &[1, 2, 3, 4, 5, 6]);
    let mut b = [0u8; 4];
    let h = c1.irecv(0, tag.base(), &mut b);
    assert_eq!(h.wait().unwrap(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn no_comm_is_nop() {
    let comm = NoComm;
    assert!(comm.is_no_comm());
    assert_eq!((comm.rank(), comm.size()), (0, 1));
    let mut buf = [0u8; 8];
    assert!(comm.irecv(0, 123, &mut buf).wait().is_none());
    assert!(comm.isend(0, 123, &[]).wait().is_none());
}

#[test]
fn receive_posted_before_send_completes() {
    let world = RayonComm::world(2);
    let payload = [1.5f64, -0.25, 1e300];
    let mut buf = [0u8; 24];
    let rx = world[1].irecv(0, 2048, &mut buf);
    let sender = world[0].clone();
    let t = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        sender.isend(1, 2048, cast_slice(&payload));
    });
    let got = rx.wait().expect("payload");
    t.join().unwrap();
    assert_eq!(got, cast_slice::<f64, u8>(&payload));
}

#[test]
fn tags_isolate_exchange_kinds() {
    let world = RayonComm::world(2);
    let mut a = [0u8; 1];
    let mut b = [0u8; 1];
    let rxa = world[1].irecv(0, 1024, &mut a);
    let rxb = world[1].irecv(0, 3072, &mut b);
    world[0].isend(1, 3072, &[2]);
    world[0].isend(1, 1024, &[1]);
    assert_eq!(rxa.wait(), Some(vec![1]));
    assert_eq!(rxb.wait(), Some(vec![2]));
}

#[test]
fn timed_out_receive_yields_none() {
    let world = RayonComm::world(2);
    let mut buf = [0u8; 4];
    let rx = world[0]
        .clone()
        .with_timeout(Duration::from_millis(5))
        .irecv(1, 1, &mut buf);
    assert!(rx.wait().is_none());
}

#[cfg(feature = "mpi-support")]
#[test]
fn mpi_comm_smoke_if_available() {
    use mesh_halo::algs::communicator::MpiComm;
    let world = MpiComm::new().expect("MPI initialization failed");
    let me = world.rank();
    let n = world.size();
    const TAG: u16 = 0xCAFE;
    let to = (me + 1) % n;
    let from = (me + n - 1) % n;
    let tx = [42u8, me as u8, 0, 0];
    let mut rx = [0u8; 4];
    let r = world.irecv(from, TAG, &mut rx);
    let s = world.isend(to, TAG, &tx);
    let got = r.wait().expect("mpi rx");
    assert_eq!(got[0], 42);
    assert_eq!(got[1] as usize, from);
    let _ = s.wait();

    // a short message comes back at its real length, not zero-padded
    let mut rx = [0u8; 8];
    let r = world.irecv(me, TAG + 1, &mut rx);
    let s = world.isend(me, TAG + 1, &[7, 7, 7]);
    assert_eq!(r.wait(), Some(vec![7, 7, 7]));
    let _ = s.wait();
}
