mod buffer_pool_test;
