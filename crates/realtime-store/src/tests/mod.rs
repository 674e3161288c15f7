mod remote_store_test;
