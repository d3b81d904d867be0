//! Integration tests for the USB transport against an in-memory bus
//!
//! Covers:
//! - Binding and mode transitions
//! - Write routing to control and bulk transfers
//! - Inbound polling, reassembly and readiness tracking

mod support;

use common::{Error, Mode, UsbParams};
use protocol::{HciPacket, PacketType, reset_command};
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::*;
use transport::usb::{TransferKind, UsbTransport};
use transport::Transport;

const RESET_COMPLETE: [u8; 6] = [0x0e, 0x04, 0x01, 0x03, 0x0c, 0x00];

fn usb_transport(bus: &MockBus) -> UsbTransport<MockBus> {
    UsbTransport::new(Arc::new(bus.clone()), UsbParams::default())
}

fn csr_bus() -> MockBus {
    MockBus::new(vec![device(MOUSE, 1, 1), device(CSR, 1, 4)])
}

mod binding {
    use super::*;

    #[test]
    fn test_bind_user_configures_and_claims() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);

        transport.bind_user(0, None).unwrap();

        assert_eq!(transport.mode(), Mode::User);
        assert_eq!(bus.opened(), vec![device(CSR, 1, 4)]);
        assert_eq!(bus.configurations(), vec![1]);
        assert_eq!(bus.claimed(), vec![0]);
        assert!(bus.control_transfers().is_empty());
        assert!(!transport.is_dev_up());
    }

    #[test]
    fn test_bind_raw_issues_reset() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);

        transport.bind_raw(0, None).unwrap();
        bus.wait_for_transfers(1);

        assert_eq!(transport.mode(), Mode::Raw);
        let control = bus.control_transfers();
        assert_eq!(control.len(), 1);
        assert_eq!(control[0].request_type, 0x21);
        assert_eq!(control[0].request, 0);
        assert_eq!(control[0].value, 0);
        assert_eq!(control[0].index, 0);
        assert_eq!(control[0].data, reset_command()[1..].to_vec());
    }

    #[test]
    fn test_no_device_found() {
        let bus = MockBus::new(vec![device(MOUSE, 1, 1)]);
        let mut transport = usb_transport(&bus);

        let err = transport.bind_user(0, None).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound));
        assert_eq!(transport.mode(), Mode::Unbound);
        assert!(bus.opened().is_empty());
    }

    #[test]
    fn test_failed_claim_releases_handle() {
        let bus = csr_bus().failing_claim();
        let mut transport = usb_transport(&bus);

        assert!(transport.bind_user(0, None).is_err());
        assert_eq!(transport.mode(), Mode::Unbound);
        assert_eq!(bus.opened().len(), 1);
        assert_eq!(bus.open_handles(), 0);
    }

    #[test]
    fn test_no_rebind() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        let err = transport.bind_raw(0, None).unwrap_err();
        assert!(matches!(err, Error::InvalidState { mode: Mode::User, .. }));
        assert!(transport.bind_control().is_err());
        assert_eq!(bus.opened().len(), 1);
    }

    #[test]
    fn test_bind_control_touches_nothing() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);

        transport.bind_control().unwrap();

        assert_eq!(transport.mode(), Mode::Control);
        assert!(bus.opened().is_empty());
        assert!(transport.bind_user(0, None).is_err());
    }

    #[test]
    fn test_dev_id_selects_nth_match() {
        let bus = MockBus::new(vec![
            device(CSR, 1, 4),
            device(CSR, 2, 3),
            device(CSR, 3, 9),
        ]);
        let mut transport = usb_transport(&bus);
        let params = UsbParams {
            vid: Some(CSR.0),
            pid: Some(CSR.1),
            ..Default::default()
        };

        transport.bind_user(2, Some(&params)).unwrap();
        assert_eq!(bus.opened(), vec![device(CSR, 2, 3)]);
    }

    #[test]
    fn test_environment_params_used_when_not_given() {
        let bus = MockBus::new(vec![device(CSR, 1, 4), device(INTEL_8265, 1, 5)]);
        let env = UsbParams {
            vid: Some(INTEL_8265.0),
            pid: Some(INTEL_8265.1),
            ..Default::default()
        };
        let mut transport = UsbTransport::new(Arc::new(bus.clone()), env);

        transport.bind_user(0, None).unwrap();
        assert_eq!(bus.opened(), vec![device(INTEL_8265, 1, 5)]);
    }

    #[test]
    fn test_explicit_params_override_environment() {
        let bus = MockBus::new(vec![device(CSR, 1, 4), device(INTEL_8265, 1, 5)]);
        let env = UsbParams {
            vid: Some(INTEL_8265.0),
            pid: Some(INTEL_8265.1),
            ..Default::default()
        };
        let mut transport = UsbTransport::new(Arc::new(bus.clone()), env);
        let explicit = UsbParams {
            bus: Some(1),
            address: Some(4),
            vid: Some(CSR.0),
            pid: Some(CSR.1),
        };

        transport.bind_user(7, Some(&explicit)).unwrap();
        assert_eq!(bus.opened(), vec![device(CSR, 1, 4)]);
    }

    #[test]
    fn test_acl_out_falls_back_to_endpoint_one() {
        let bus = csr_bus().with_endpoints(vec![
            endpoint(0x81, TransferKind::Interrupt),
            endpoint(0x82, TransferKind::Bulk),
            endpoint(0x01, TransferKind::Bulk),
        ]);
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport.write(&[0x02, 0x40, 0x00, 0x01, 0x00, 0xaa]).unwrap();
        bus.wait_for_transfers(1);

        let bulk = bus.bulk_transfers();
        assert_eq!(bulk.len(), 1);
        assert_eq!(bulk[0].endpoint, 0x01);
    }

    #[test]
    fn test_missing_event_endpoint_fails_bind() {
        let bus = csr_bus().with_endpoints(vec![
            endpoint(0x82, TransferKind::Bulk),
            endpoint(0x02, TransferKind::Bulk),
        ]);
        let mut transport = usb_transport(&bus);

        let err = transport.bind_user(0, None).unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound(0x81)));
        assert_eq!(transport.mode(), Mode::Unbound);
        assert_eq!(bus.open_handles(), 0);
    }

    #[test]
    fn test_device_list_known_only() {
        let bus = MockBus::new(vec![
            device(MOUSE, 1, 1),
            device(CSR, 1, 4),
            device(INTEL_8265, 2, 2),
        ]);
        let transport = usb_transport(&bus);

        let list = transport.device_list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!((list[0].id_vendor, list[0].id_product), CSR);
        assert_eq!((list[1].bus_number, list[1].device_address), (2, 2));
        assert!(list.iter().all(|d| d.dev_id.is_none() && d.dev_up.is_none()));
    }
}

mod writing {
    use super::*;

    #[test]
    fn test_command_goes_to_control_endpoint() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport.write(&[0x01, 0x01, 0x10, 0x00]).unwrap();
        bus.wait_for_transfers(1);

        let control = bus.control_transfers();
        assert_eq!(control.len(), 1);
        assert_eq!(control[0].data, vec![0x01, 0x10, 0x00]);
        assert!(bus.bulk_transfers().is_empty());
    }

    #[test]
    fn test_acl_goes_to_bulk_endpoint() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport
            .write(&[0x02, 0x01, 0x20, 0x02, 0x00, 0xde, 0xad])
            .unwrap();
        bus.wait_for_transfers(1);

        let bulk = bus.bulk_transfers();
        assert_eq!(bulk.len(), 1);
        assert_eq!(bulk[0].endpoint, 0x02);
        assert_eq!(bulk[0].data, vec![0x01, 0x20, 0x02, 0x00, 0xde, 0xad]);
        assert!(bus.control_transfers().is_empty());
    }

    #[test]
    fn test_bad_packets_rejected() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        assert!(matches!(transport.write(&[]), Err(Error::Protocol(_))));
        assert!(matches!(transport.write(&[0x07, 0x00]), Err(Error::Protocol(_))));
        assert!(matches!(
            transport.write(&[0x03, 0x00, 0x00, 0x00]),
            Err(Error::Protocol(_))
        ));
        assert!(bus.control_transfers().is_empty());
        assert!(bus.bulk_transfers().is_empty());
    }

    #[test]
    fn test_write_requires_data_mode() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);

        assert!(matches!(
            transport.write(&[0x01, 0x03, 0x0c, 0x00]),
            Err(Error::InvalidState { mode: Mode::Unbound, .. })
        ));

        transport.bind_control().unwrap();
        assert!(matches!(
            transport.write(&[0x01, 0x03, 0x0c, 0x00]),
            Err(Error::InvalidState { mode: Mode::Control, .. })
        ));
        assert!(matches!(
            transport.write(&[0x02, 0x01, 0x20, 0x01, 0x00, 0xaa]),
            Err(Error::InvalidState { mode: Mode::Control, .. })
        ));
        assert!(transport.reset().is_err());
        assert!(bus.control_transfers().is_empty());
        assert!(bus.bulk_transfers().is_empty());
    }

    #[test]
    fn test_writes_do_not_wait_for_transfers() {
        let bus = csr_bus().slow_writes(Duration::from_millis(300));
        let mut transport = usb_transport(&bus);

        let started = Instant::now();
        transport.bind_raw(0, None).unwrap();
        for _ in 0..3 {
            transport.write(&[0x02, 0x01, 0x20, 0x01, 0x00, 0xaa]).unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(300));

        bus.wait_for_transfers(4);
        assert_eq!(bus.control_transfers()[0].data, reset_command()[1..].to_vec());
        assert_eq!(bus.bulk_transfers().len(), 3);
    }

    #[test]
    fn test_queued_writes_issued_in_order() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        for seq in 0..8u8 {
            transport.write(&[0x02, 0x01, 0x20, 0x01, 0x00, seq]).unwrap();
        }
        bus.wait_for_transfers(8);

        let payloads: Vec<u8> = bus.bulk_transfers().iter().map(|t| t.data[4]).collect();
        assert_eq!(payloads, (0..8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_transfer_failure_not_surfaced() {
        let bus = csr_bus().failing_writes();
        let mut transport = usb_transport(&bus);

        transport.bind_raw(0, None).unwrap();
        transport.write(&[0x02, 0x01, 0x00, 0x00, 0x00]).unwrap();
    }

    #[test]
    fn test_set_filter_is_accepted() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport.set_filter(&[0xff; 14]).unwrap();
    }
}

mod polling {
    use super::*;

    #[test]
    fn test_start_requires_data_mode() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);

        assert!(transport.start().is_err());
        transport.bind_control().unwrap();
        assert!(transport.start().is_err());
        assert!(transport.stop().is_err());
    }

    #[test]
    fn test_event_delivered_and_readiness_set_in_raw_mode() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_raw(0, None).unwrap();
        transport.start().unwrap();
        assert!(transport.is_polling());

        bus.push_read(0x81, &RESET_COMPLETE[..3]);
        bus.push_read(0x81, &RESET_COMPLETE[3..]);

        let packet = recv_within(&transport.packets()).expect("no event delivered");
        assert_eq!(packet.packet_type(), PacketType::Event);
        assert_eq!(&packet.frame()[..], &RESET_COMPLETE[..]);
        assert!(transport.is_dev_up());

        transport.stop().unwrap();
        assert!(!transport.is_polling());
    }

    #[test]
    fn test_readiness_not_tracked_in_user_mode() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();
        transport.start().unwrap();

        bus.push_read(0x81, &RESET_COMPLETE);

        assert!(recv_within(&transport.packets()).is_some());
        assert!(!transport.is_dev_up());
    }

    #[test]
    fn test_acl_reassembled_from_bulk_reads() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();
        transport.start().unwrap();

        bus.push_read(0x82, &[0x01, 0x20, 0x03]);
        bus.push_read(0x82, &[0x00, 0x0a, 0x0b, 0x0c, 0x01, 0x20]);

        let packet = recv_within(&transport.packets()).expect("no ACL packet delivered");
        assert_eq!(
            packet,
            HciPacket::AclData(vec![0x01, 0x20, 0x03, 0x00, 0x0a, 0x0b, 0x0c].into())
        );
        assert!(transport.packets().try_recv().is_none());
    }

    #[test]
    fn test_partial_frame_survives_restart() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();
        transport.start().unwrap();

        bus.push_read(0x81, &RESET_COMPLETE[..2]);
        bus.wait_drained(0x81);
        transport.stop().unwrap();
        assert!(transport.packets().try_recv().is_none());

        bus.push_read(0x81, &RESET_COMPLETE[2..]);
        transport.start().unwrap();

        let packet = recv_within(&transport.packets()).expect("frame lost across restart");
        assert_eq!(&packet.frame()[..], &RESET_COMPLETE[..]);
    }

    #[test]
    fn test_start_is_idempotent() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport.start().unwrap();
        transport.start().unwrap();
        bus.push_read(0x81, &RESET_COMPLETE);

        let packets = transport.packets();
        assert!(recv_within(&packets).is_some());
        std::thread::sleep(Duration::from_millis(20));
        assert!(packets.try_recv().is_none());
    }

    #[test]
    fn test_stop_without_start() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();

        transport.stop().unwrap();
    }

    #[test]
    fn test_restart_after_pollers_exit_on_disconnect() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();
        transport.start().unwrap();

        bus.push_read(0x81, &RESET_COMPLETE[..4]);
        bus.wait_drained(0x81);
        bus.disconnect(0x81);
        bus.disconnect(0x82);
        wait_until("pollers to exit", || !transport.is_polling());

        bus.reconnect(0x81);
        bus.reconnect(0x82);
        bus.push_read(0x81, &RESET_COMPLETE[4..]);
        transport.start().unwrap();
        assert!(transport.is_polling());

        let packet = recv_within(&transport.packets()).expect("no event after restart");
        assert_eq!(&packet.frame()[..], &RESET_COMPLETE[..]);
    }

    #[test]
    fn test_restart_replaces_only_the_exited_poller() {
        let bus = csr_bus();
        let mut transport = usb_transport(&bus);
        transport.bind_user(0, None).unwrap();
        transport.start().unwrap();

        bus.disconnect(0x82);
        wait_until("ACL poller to exit", || !transport.is_polling());
        bus.reconnect(0x82);
        transport.start().unwrap();

        // A second event poller would split these chunks between two buffers
        for byte in RESET_COMPLETE {
            bus.push_read(0x81, &[byte]);
        }
        bus.push_read(0x82, &[0x01, 0x20, 0x01, 0x00, 0xaa]);

        let packets = transport.packets();
        let mut received = vec![
            recv_within(&packets).expect("first packet"),
            recv_within(&packets).expect("second packet"),
        ];
        received.sort_by_key(|p| p.packet_type() == PacketType::AclData);
        assert_eq!(&received[0].frame()[..], &RESET_COMPLETE[..]);
        assert_eq!(received[1].packet_type(), PacketType::AclData);

        std::thread::sleep(Duration::from_millis(20));
        assert!(packets.try_recv().is_none());
    }
}
